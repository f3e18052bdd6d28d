use super::grad_named;
use crate::module::GradientSet;
use crate::nn::NnError;
use crate::tensor::Tensor;

fn set(entries: &[(&str, &[f32])]) -> GradientSet {
    entries
        .iter()
        .map(|(name, values)| (name.to_string(), Tensor::new(values, &[values.len()])))
        .collect()
}

#[test]
fn test_accumulate_is_elementwise_sum() -> Result<(), NnError> {
    let mut combined = set(&[("w", &[1.0, 2.0]), ("b", &[0.5])]);
    let other = set(&[("w", &[10.0, 20.0]), ("b", &[-0.5])]);
    combined.accumulate(&other)?;

    assert_eq!(combined, set(&[("w", &[11.0, 22.0]), ("b", &[0.0])]));
    // 被累加的一方不变
    assert_eq!(grad_named(&other, "w"), Some(&Tensor::new(&[10.0, 20.0], &[2])));
    Ok(())
}

#[test]
fn test_accumulate_rejects_mismatch() {
    let mut a = set(&[("w", &[1.0])]);
    assert!(matches!(
        a.accumulate(&set(&[("w", &[1.0]), ("b", &[1.0])])),
        Err(NnError::GradientMismatch { .. })
    ));
    assert!(matches!(
        a.accumulate(&set(&[("v", &[1.0])])),
        Err(NnError::GradientMismatch { .. })
    ));
    assert!(matches!(
        a.accumulate(&set(&[("w", &[1.0, 2.0])])),
        Err(NnError::Tensor(_))
    ));
}

#[test]
fn test_iteration_order() {
    let mut grads = GradientSet::new();
    assert!(grads.is_empty());
    grads.push("a", Tensor::zeros(&[1]));
    grads.push("b", Tensor::ones(&[1]));
    let names: Vec<&str> = grads.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(grads.len(), 2);
    assert!(grad_named(&grads, "c").is_none());
}
