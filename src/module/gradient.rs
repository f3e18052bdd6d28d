use crate::nn::NnError;
use crate::tensor::Tensor;

/// 一组具名梯度（顺序与模块参数顺序一致），是模块梯度的独立快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientSet {
    entries: Vec<(String, Tensor)>,
}

impl GradientSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, grad: Tensor) {
        self.entries.push((name.into(), grad));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(name, grad)| (name.as_str(), grad))
    }

    pub fn into_entries(self) -> Vec<(String, Tensor)> {
        self.entries
    }

    /// 逐元素累加另一组梯度：self += other。两组的名称、顺序与形状必须一一对应
    pub fn accumulate(&mut self, other: &GradientSet) -> Result<(), NnError> {
        if self.len() != other.len() {
            return Err(NnError::GradientMismatch {
                module: "gradient_set".to_string(),
                message: format!("梯度个数 {} 与 {} 不一致", self.len(), other.len()),
            });
        }
        for ((name, grad), (other_name, other_grad)) in self.entries.iter_mut().zip(&other.entries)
        {
            if name != other_name {
                return Err(NnError::GradientMismatch {
                    module: "gradient_set".to_string(),
                    message: format!("梯度名 {name} 与 {other_name} 不对应"),
                });
            }
            grad.try_add_assign(other_grad)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, Tensor)> for GradientSet {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
