/*
 * @Description  : 逐元素激活层。均无参数，训练前向时缓存反向所需的输入或输出。
 */

use super::{Layer, cached};
use crate::nn::NnError;
use crate::tensor::Tensor;

fn check_grad_shape(layer: &str, cache: &Tensor, grad_output: &Tensor) -> Result<(), NnError> {
    if cache.is_same_shape(grad_output) {
        Ok(())
    } else {
        Err(NnError::ShapeMismatch {
            layer: layer.to_string(),
            expected: cache.shape().to_vec(),
            got: grad_output.shape().to_vec(),
        })
    }
}

/// ReLU: y = max(0, x)
pub struct Relu {
    name: String,
    input: Option<Tensor>,
}

impl Relu {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input: None,
        }
    }
}

impl Layer for Relu {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        if is_train {
            self.input = Some(input.clone());
        }
        Ok(input.map(|x| x.max(0.0)))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let input = cached(&self.name, &self.input)?;
        check_grad_shape(&self.name, input, grad_output)?;
        let mask = input.map(|x| if x > 0.0 { 1.0 } else { 0.0 });
        Ok(grad_output * &mask)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        Ok(input_shape.to_vec())
    }
}

/// LeakyReLU: y = x (x > 0)，y = slope * x (x ≤ 0)
pub struct LeakyRelu {
    name: String,
    slope: f32,
    input: Option<Tensor>,
}

impl LeakyRelu {
    pub fn new(name: &str, slope: f32) -> Self {
        Self {
            name: name.to_string(),
            slope,
            input: None,
        }
    }
}

impl Layer for LeakyRelu {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        if is_train {
            self.input = Some(input.clone());
        }
        let slope = self.slope;
        Ok(input.map(|x| if x > 0.0 { x } else { slope * x }))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let input = cached(&self.name, &self.input)?;
        check_grad_shape(&self.name, input, grad_output)?;
        let slope = self.slope;
        let mask = input.map(|x| if x > 0.0 { 1.0 } else { slope });
        Ok(grad_output * &mask)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        Ok(input_shape.to_vec())
    }
}

/// Tanh: dy/dx = 1 - y²
pub struct Tanh {
    name: String,
    output: Option<Tensor>,
}

impl Tanh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            output: None,
        }
    }
}

impl Layer for Tanh {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        let output = input.map(f32::tanh);
        if is_train {
            self.output = Some(output.clone());
        }
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let output = cached(&self.name, &self.output)?;
        check_grad_shape(&self.name, output, grad_output)?;
        Ok(grad_output * &output.map(|y| 1.0 - y * y))
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        Ok(input_shape.to_vec())
    }
}

/// 数值稳定的 sigmoid
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
