/*
 * @Description  : Linear（全连接）层
 *
 * 计算：output = x @ W + b
 * - 输入：[batch_size, ...]，第0维以外的维度会先展平为 in_features
 * - 输出：[batch_size, out_features]
 */

use ndarray::{Array2, Axis, Ix2};

use super::Layer;
use crate::nn::param::ParamKind;
use crate::nn::{NnError, Param};
use crate::tensor::Tensor;

/// Linear（全连接）层
///
/// # 使用示例
/// ```ignore
/// let mut fc = Linear::new("g_fc", 100, 6272, false);
/// let h = fc.forward(&z, true)?;
/// ```
pub struct Linear {
    name: String,
    in_features: usize,
    out_features: usize,
    /// 权重 [in_features, out_features]
    weight: Param,
    /// 偏置 [out_features]（可选）
    bias: Option<Param>,
    /// 训练前向时缓存的（已展平）输入，以及原始输入形状
    input: Option<Tensor>,
    input_shape: Vec<usize>,
}

impl Linear {
    pub fn new(name: &str, in_features: usize, out_features: usize, use_bias: bool) -> Self {
        let weight = Param::new(
            format!("{name}_weight"),
            ParamKind::Weight,
            &[in_features, out_features],
        );
        let bias = use_bias
            .then(|| Param::new(format!("{name}_bias"), ParamKind::Bias, &[out_features]));
        Self {
            name: name.to_string(),
            in_features,
            out_features,
            weight,
            bias,
            input: None,
            input_shape: Vec::new(),
        }
    }

    fn flat_input(&self, input: &Tensor) -> Result<Array2<f32>, NnError> {
        let flat = input.flatten_batch()?;
        if flat.shape()[1] != self.in_features {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: vec![flat.shape()[0], self.in_features],
                got: input.shape().to_vec(),
            });
        }
        to_matrix(&self.name, flat)
    }
}

impl Layer for Linear {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        let x = self.flat_input(input)?;
        let w = to_matrix(&self.name, self.weight.value().clone())?;

        // [batch, in] @ [in, out] = [batch, out]
        let mut y = x.dot(&w);
        if let Some(bias) = &self.bias {
            y += bias.value().data();
        }

        if is_train {
            self.input = Some(Tensor::from_array(x.into_dyn()));
            self.input_shape = input.shape().to_vec();
        }
        Ok(Tensor::from_array(y.into_dyn()))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let x = to_matrix(&self.name, super::cached(&self.name, &self.input)?.clone())?;
        let dy = to_matrix(&self.name, grad_output.clone())?;
        let w = to_matrix(&self.name, self.weight.value().clone())?;

        // dW = xᵀ @ dy，db = Σ_batch dy，dx = dy @ Wᵀ
        *self.weight.grad_mut() = Tensor::from_array(x.t().dot(&dy).into_dyn());
        if let Some(bias) = &mut self.bias {
            *bias.grad_mut() = Tensor::from_array(dy.sum_axis(Axis(0)).into_dyn());
        }
        let dx = Tensor::from_array(dy.dot(&w.t()).into_dyn());
        Ok(dx.into_reshape(&self.input_shape)?)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        let batch = input_shape.first().copied().unwrap_or(0);
        let features = input_shape.iter().skip(1).product::<usize>();
        if features != self.in_features {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: vec![batch, self.in_features],
                got: input_shape.to_vec(),
            });
        }
        Ok(vec![batch, self.out_features])
    }

    fn params(&self) -> Vec<&Param> {
        std::iter::once(&self.weight).chain(self.bias.as_ref()).collect()
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        std::iter::once(&mut self.weight)
            .chain(self.bias.as_mut())
            .collect()
    }
}

fn to_matrix(layer: &str, tensor: Tensor) -> Result<Array2<f32>, NnError> {
    let shape = tensor.shape().to_vec();
    tensor
        .into_array()
        .into_dimensionality::<Ix2>()
        .map_err(|_| NnError::ShapeMismatch {
            layer: layer.to_string(),
            expected: vec![0, 0],
            got: shape,
        })
}
