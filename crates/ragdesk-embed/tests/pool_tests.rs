use candle_core::{DType, Device, Tensor};
use ragdesk_embed::masked_mean_l2;

fn l2(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

#[test]
fn padding_tokens_do_not_contribute() {
    let dev = Device::Cpu;
    // One sequence, two tokens, hidden dim 4; the second token is padding.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0], (1, 2), &dev).unwrap().to_dtype(DType::F32).unwrap();

    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();

    for (a, b) in out[0].iter().zip(l2(&[1.0, 2.0, 3.0, 4.0])) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn pools_each_row_independently() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(
        &[
            1.0f32, 0.0, // row 0, token 0
            9.0, 9.0, // row 0, token 1 (masked)
            2.0, 2.0, // row 1, token 0
            4.0, 4.0, // row 1, token 1
        ],
        (2, 2, 2),
        &dev,
    )
    .unwrap();
    let mask = Tensor::from_slice(&[1u32, 0, 1, 1], (2, 2), &dev).unwrap();

    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();

    assert_eq!(out.len(), 2);
    // Row 0 keeps only its first token; row 1 averages [2,2] and [4,4].
    for (a, b) in out[0].iter().zip(l2(&[1.0, 0.0])) {
        assert!((a - b).abs() < 1e-5);
    }
    for (a, b) in out[1].iter().zip(l2(&[3.0, 3.0])) {
        assert!((a - b).abs() < 1e-5);
    }
}
