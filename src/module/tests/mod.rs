mod gradient;

use crate::module::GradientSet;
use crate::tensor::Tensor;

/// 按名称取出某个梯度
fn grad_named<'a>(grads: &'a GradientSet, name: &str) -> Option<&'a Tensor> {
    grads.iter().find(|(n, _)| *n == name).map(|(_, grad)| grad)
}
