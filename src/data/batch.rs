use crate::tensor::Tensor;

/// 一个数据批：第0维为批大小
///
/// `pad` 表示末尾有多少个样本是为凑满批而从数据开头回绕补上的。
#[derive(Debug, Clone, PartialEq)]
pub struct DataBatch {
    pub data: Tensor,
    pub label: Option<Tensor>,
    pub pad: usize,
}

impl DataBatch {
    pub fn new(data: Tensor) -> Self {
        Self {
            data,
            label: None,
            pad: 0,
        }
    }

    pub fn with_label(mut self, label: Tensor) -> Self {
        self.label = Some(label);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.data.shape().first().copied().unwrap_or(0)
    }
}
