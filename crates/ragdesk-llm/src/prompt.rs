use ragdesk_core::DocumentChunk;

const INSTRUCTION: &str = "You are a helpful corporate assistant. Use the following context to answer the user's question.\n\
If the answer is not in the context, say you don't know based on the provided documents.";

/// Sources are numbered from 1 in the order given.
pub fn build_prompt(question: &str, context: &[DocumentChunk]) -> String {
    let context_text = context
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("Source {}:\n{}", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{INSTRUCTION}\n\nContext:\n{context_text}\n\nQuestion: {question}\nAnswer:")
}
