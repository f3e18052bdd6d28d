use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 改变张量形状（元素总数必须保持不变）
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        self.clone().into_reshape(shape)
    }

    /// 消耗自身并改变形状，避免一次额外的拷贝
    pub fn into_reshape(self, shape: &[usize]) -> Result<Self, TensorError> {
        let from = self.shape().to_vec();
        if self.size() != shape.iter().product::<usize>() {
            return Err(TensorError::IncompatibleShape {
                from,
                to: shape.to_vec(),
            });
        }
        let data = self
            .data
            .into_shape(ndarray::IxDyn(shape))
            .map_err(|_| TensorError::IncompatibleShape {
                from,
                to: shape.to_vec(),
            })?;
        Ok(Tensor { data })
    }

    /// 保留第0维（批维度），将其余维度展平为1维：[N, ...] -> [N, prod(...)]
    pub fn flatten_batch(&self) -> Result<Self, TensorError> {
        let batch = self.shape().first().copied().unwrap_or(1);
        let rest = self.shape().iter().skip(1).product::<usize>();
        self.reshape(&[batch, rest])
    }

    /// 沿第0维拼接多个张量，除第0维外其余维度必须一致
    pub fn concat_samples(tensors: &[&Tensor]) -> Result<Self, TensorError> {
        let views: Vec<_> = tensors.iter().map(|t| t.data.view()).collect();
        let data = ndarray::concatenate(ndarray::Axis(0), &views).map_err(|_| {
            TensorError::OperatorError {
                operator: crate::errors::Operator::Concat,
                tensor1_shape: tensors.first().map(|t| t.shape().to_vec()).unwrap_or_default(),
                tensor2_shape: tensors.last().map(|t| t.shape().to_vec()).unwrap_or_default(),
            }
        })?;
        Ok(Tensor::from_array(data))
    }
}
