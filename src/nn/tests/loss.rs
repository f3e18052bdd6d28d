use approx::assert_abs_diff_eq;

use crate::nn::{LogisticRegressionOutput, NnError};
use crate::tensor::Tensor;

#[test]
fn test_logistic_output_gradient_is_p_minus_label() -> Result<(), NnError> {
    let mut head = LogisticRegressionOutput::new();
    let p = head.forward(&Tensor::new(&[0.0, 2.0, -2.0], &[3, 1]));
    assert_abs_diff_eq!(p[[0, 0]], 0.5, epsilon = 1e-6);

    // 标签可以是 [B] 形状
    let grad = head.backward(&Tensor::new(&[1.0, 0.0, 1.0], &[3]))?;
    assert_eq!(grad.shape(), &[3, 1]);
    assert_abs_diff_eq!(grad[[0, 0]], -0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[1, 0]], p[[1, 0]], epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[2, 0]], p[[2, 0]] - 1.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_logistic_output_errors() {
    let mut head = LogisticRegressionOutput::new();
    assert!(matches!(
        head.backward(&Tensor::zeros(&[2])),
        Err(NnError::NoForwardCache(_))
    ));
    head.forward(&Tensor::zeros(&[2, 1]));
    assert!(matches!(
        head.backward(&Tensor::zeros(&[3])),
        Err(NnError::ShapeMismatch { .. })
    ));
}
