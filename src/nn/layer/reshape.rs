use super::Layer;
use crate::nn::NnError;
use crate::tensor::Tensor;

/// 将 [batch, ...] 重塑为 [batch, target...]，批维度保持不变
pub struct Reshape {
    name: String,
    target: Vec<usize>,
    input_shape: Vec<usize>,
}

impl Reshape {
    /// `target`为不含批维度的目标形状
    pub fn new(name: &str, target: &[usize]) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_vec(),
            input_shape: Vec::new(),
        }
    }
}

impl Layer for Reshape {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        let shape = self.output_shape(input.shape())?;
        if is_train {
            self.input_shape = input.shape().to_vec();
        }
        Ok(input.reshape(&shape)?)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        if self.input_shape.is_empty() {
            return Err(NnError::NoForwardCache(self.name.clone()));
        }
        Ok(grad_output.reshape(&self.input_shape)?)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        let batch = input_shape.first().copied().unwrap_or(0);
        let per_sample = input_shape.iter().skip(1).product::<usize>();
        if per_sample != self.target.iter().product::<usize>() {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: std::iter::once(batch).chain(self.target.iter().copied()).collect(),
                got: input_shape.to_vec(),
            });
        }
        Ok(std::iter::once(batch).chain(self.target.iter().copied()).collect())
    }
}

/// 展平：[batch, ...] -> [batch, prod(...)]
pub struct Flatten {
    name: String,
    input_shape: Vec<usize>,
}

impl Flatten {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input_shape: Vec::new(),
        }
    }
}

impl Layer for Flatten {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        if is_train {
            self.input_shape = input.shape().to_vec();
        }
        Ok(input.flatten_batch()?)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        if self.input_shape.is_empty() {
            return Err(NnError::NoForwardCache(self.name.clone()));
        }
        Ok(grad_output.reshape(&self.input_shape)?)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        let batch = input_shape.first().copied().unwrap_or(0);
        Ok(vec![batch, input_shape.iter().skip(1).product()])
    }
}
