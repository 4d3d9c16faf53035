use candle_core::{DType, Device, Tensor};
use regdoc_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_basic() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1i64, 0i64], (1, 2), &dev).unwrap().to_dtype(DType::F32).unwrap();
    let out = masked_mean_l2(&h, &mask).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    let norm: f32 = (1.0f32 + 4.0 + 9.0 + 16.0).sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in v[0].iter().cloned().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={} b={}", a, b);
    }
}

#[test]
fn masked_mean_l2_batches_rows_independently() {
    let dev = Device::Cpu;
    // [B=2, T=2, H=2]; row 0 masks its second token.
    let h = Tensor::from_slice(&[3.0f32, 4.0, 100.0, 100.0, 1.0, 0.0, 0.0, 1.0], (2, 2, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0, 1, 1], (2, 2), &dev).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    assert!((v[0][0] - 0.6).abs() < 1e-5 && (v[0][1] - 0.8).abs() < 1e-5);
    let half = std::f32::consts::FRAC_1_SQRT_2;
    assert!((v[1][0] - half).abs() < 1e-5 && (v[1][1] - half).abs() < 1e-5);
}

#[test]
fn rejects_non_3d_hidden_state() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((2, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((2,), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}
