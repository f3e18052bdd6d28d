use approx::assert_abs_diff_eq;

use crate::metric::{AccMetric, CrossEntropyMetric, EvalMetric, MetricError};
use crate::tensor::Tensor;

#[test]
fn test_fresh_metric_reads_zero() {
    let ce = CrossEntropyMetric::new();
    let acc = AccMetric::new();
    assert_eq!(ce.get(), ("ce", 0.0));
    assert_eq!(acc.get(), ("acc", 0.0));
    assert_eq!(acc.num_inst(), 0);
}

#[test]
fn test_cross_entropy_values() -> Result<(), MetricError> {
    let mut ce = CrossEntropyMetric::new();
    // y=1,p=0.5 与 y=0,p=0.5 都是 ln2
    ce.update(&Tensor::new(&[1.0, 0.0], &[2]), &Tensor::new(&[0.5, 0.5], &[2, 1]))?;
    assert_eq!(ce.num_inst(), 2);
    assert_abs_diff_eq!(ce.get().1, std::f64::consts::LN_2, epsilon = 1e-6);

    // p 恰为 0 时由平滑项截断，结果有限
    ce.update(&Tensor::new(&[1.0], &[1]), &Tensor::new(&[0.0], &[1]))?;
    assert!(ce.sum_metric().is_finite());
    assert_abs_diff_eq!(ce.sum_metric(), 2.0 * std::f64::consts::LN_2 + 1e-12f64.ln().abs(), epsilon = 1e-3);
    Ok(())
}

#[test]
fn test_accuracy_threshold() -> Result<(), MetricError> {
    let mut acc = AccMetric::new();
    let labels = Tensor::new(&[1.0, 1.0, 0.0, 0.0], &[4]);
    // 0.5 本身判为0
    let preds = Tensor::new(&[0.9, 0.5, 0.1, 0.7], &[4, 1]);
    acc.update(&labels, &preds)?;
    assert_eq!(acc.num_inst(), 4);
    assert_abs_diff_eq!(acc.get().1, 0.5);
    Ok(())
}

#[test]
fn test_reset_clears_state() -> Result<(), MetricError> {
    let mut acc = AccMetric::new();
    acc.update(&Tensor::ones(&[3]), &Tensor::ones(&[3]))?;
    assert_abs_diff_eq!(acc.get().1, 1.0);
    acc.reset();
    assert_eq!(acc.num_inst(), 0);
    assert_eq!(acc.get().1, 0.0);
    Ok(())
}

#[test]
fn test_size_mismatch() {
    let mut ce = CrossEntropyMetric::new();
    let result = ce.update(&Tensor::ones(&[3]), &Tensor::ones(&[2, 1]));
    assert!(matches!(
        result,
        Err(MetricError::SizeMismatch { labels: 3, preds: 2, .. })
    ));
    assert_eq!(ce.num_inst(), 0);
}
