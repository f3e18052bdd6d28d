/*
 * @Description  : 输出头（loss head）。与普通层不同，它在反向时不需要上游梯度，
 *                 而是直接由标签给出对输入（logit）的梯度。
 */

use crate::nn::NnError;
use crate::nn::layer::sigmoid;
use crate::tensor::Tensor;

/// 逻辑回归输出头：前向输出 p = sigmoid(x)，反向输出 ∂L/∂x = p − label。
///
/// 即二元交叉熵对 logit 的梯度（未除以批大小，批平均由优化器的 `rescale_grad` 完成）。
#[derive(Default)]
pub struct LogisticRegressionOutput {
    output: Option<Tensor>,
}

impl LogisticRegressionOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, logits: &Tensor) -> Tensor {
        let output = logits.map(sigmoid);
        self.output = Some(output.clone());
        output
    }

    /// 标签元素个数须与输出一致（如输出 [B, 1]、标签 [B]）
    pub fn backward(&self, label: &Tensor) -> Result<Tensor, NnError> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| NnError::NoForwardCache("logistic_regression_output".to_string()))?;
        if output.size() != label.size() {
            return Err(NnError::ShapeMismatch {
                layer: "logistic_regression_output".to_string(),
                expected: output.shape().to_vec(),
                got: label.shape().to_vec(),
            });
        }
        let label = label.reshape(output.shape())?;
        Ok(output - &label)
    }
}
