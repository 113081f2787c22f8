use ragdesk_core::{ExtractError, TextExtractor};
use ragdesk_extract::FileTextExtractor;

#[tokio::test]
async fn decodes_utf8_text_files() {
    let text = FileTextExtractor::new().extract_text("Café policy".as_bytes(), "policy.txt").await.unwrap();
    assert_eq!(text, "Café policy");
}

#[tokio::test]
async fn invalid_utf8_is_a_decode_error() {
    let err = FileTextExtractor::new().extract_text(&[0xff, 0xfe, 0x00], "broken.txt").await.unwrap_err();
    assert!(matches!(err, ExtractError::Decode { ref filename, .. } if filename == "broken.txt"));
}

#[tokio::test]
async fn unknown_extensions_are_unsupported() {
    let err = FileTextExtractor::new().extract_text(b"PK\x03\x04", "deck.docx").await.unwrap_err();
    assert!(matches!(err, ExtractError::UnsupportedFormat(ref f) if f == "deck.docx"));
}

#[tokio::test]
async fn corrupt_pdf_is_a_parse_error() {
    let err = FileTextExtractor::new().extract_text(b"not a pdf at all", "scan.pdf").await.unwrap_err();
    assert!(matches!(err, ExtractError::Parse { .. }), "unexpected error: {err}");
}
