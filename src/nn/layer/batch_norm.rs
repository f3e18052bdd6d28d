/*
 * @Description  : BatchNorm（批归一化）层，按通道（第1维）统计
 *
 * - 输入：[batch, C] 或 [batch, C, H, W]
 * - 训练模式：用当前批的均值/方差（有偏）归一化，并更新滑动统计量
 *   moving = momentum * moving + (1 - momentum) * batch_stat
 * - 推理模式：用滑动统计量归一化
 * - fix_gamma 为 true 时 gamma 恒为 1 且不产生梯度
 */

use super::Layer;
use crate::nn::param::ParamKind;
use crate::nn::{NnError, Param};
use crate::tensor::Tensor;

/// 训练前向留给反向的缓存
struct BatchNormCache {
    /// 归一化后的输入 x̂
    x_hat: Tensor,
    /// 每个通道的 1/√(σ² + ε)
    inv_std: Vec<f32>,
}

pub struct BatchNorm {
    name: String,
    channels: usize,
    eps: f32,
    momentum: f32,
    fix_gamma: bool,
    gamma: Param,
    beta: Param,
    moving_mean: Param,
    moving_var: Param,
    cache: Option<BatchNormCache>,
}

impl BatchNorm {
    pub fn new(name: &str, channels: usize, fix_gamma: bool) -> Self {
        Self {
            name: name.to_string(),
            channels,
            eps: 1e-5,
            momentum: 0.9,
            fix_gamma,
            gamma: Param::new(format!("{name}_gamma"), ParamKind::Gamma, &[channels]),
            beta: Param::new(format!("{name}_beta"), ParamKind::Beta, &[channels]),
            moving_mean: Param::new(
                format!("{name}_moving_mean"),
                ParamKind::MovingMean,
                &[channels],
            ),
            moving_var: Param::new(
                format!("{name}_moving_var"),
                ParamKind::MovingVar,
                &[channels],
            ),
            cache: None,
        }
    }

    fn check_input(&self, shape: &[usize]) -> Result<(usize, usize), NnError> {
        if (shape.len() == 2 || shape.len() == 4) && shape[1] == self.channels {
            let spatial = shape.iter().skip(2).product::<usize>();
            return Ok((shape[0], spatial));
        }
        Err(NnError::ShapeMismatch {
            layer: self.name.clone(),
            expected: vec![shape.first().copied().unwrap_or(0), self.channels],
            got: shape.to_vec(),
        })
    }

    fn gamma_at(&self, c: usize) -> f32 {
        if self.fix_gamma {
            1.0
        } else {
            self.gamma.value().as_slice()[c]
        }
    }
}

impl Layer for BatchNorm {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        let (batch_size, spatial) = self.check_input(input.shape())?;
        let channels = self.channels;
        let count = (batch_size * spatial) as f32;
        let x = input.as_slice();
        let plane = |b: usize, c: usize| {
            let start = (b * channels + c) * spatial;
            &x[start..start + spatial]
        };

        let (mean, var): (Vec<f32>, Vec<f32>) = if is_train {
            (0..channels)
                .map(|c| {
                    let sum: f32 = (0..batch_size).map(|b| plane(b, c).iter().sum::<f32>()).sum();
                    let mean = sum / count;
                    let sq: f32 = (0..batch_size)
                        .map(|b| plane(b, c).iter().map(|v| (v - mean).powi(2)).sum::<f32>())
                        .sum();
                    (mean, sq / count)
                })
                .unzip()
        } else {
            (
                self.moving_mean.value().to_vec(),
                self.moving_var.value().to_vec(),
            )
        };

        let inv_std: Vec<f32> = var.iter().map(|v| 1.0 / (v + self.eps).sqrt()).collect();
        let beta = self.beta.value().as_slice();
        let mut x_hat = vec![0.0f32; x.len()];
        let mut output = vec![0.0f32; x.len()];
        for b in 0..batch_size {
            for c in 0..channels {
                let gamma = self.gamma_at(c);
                let start = (b * channels + c) * spatial;
                for i in start..start + spatial {
                    x_hat[i] = (x[i] - mean[c]) * inv_std[c];
                    output[i] = gamma * x_hat[i] + beta[c];
                }
            }
        }

        if is_train {
            let momentum = self.momentum;
            for (moving, batch_stat) in self
                .moving_mean
                .value_mut()
                .as_slice_mut()
                .iter_mut()
                .zip(&mean)
            {
                *moving = momentum * *moving + (1.0 - momentum) * batch_stat;
            }
            for (moving, batch_stat) in self
                .moving_var
                .value_mut()
                .as_slice_mut()
                .iter_mut()
                .zip(&var)
            {
                *moving = momentum * *moving + (1.0 - momentum) * batch_stat;
            }
            self.cache = Some(BatchNormCache {
                x_hat: Tensor::try_new(x_hat, input.shape())?,
                inv_std,
            });
        }
        Ok(Tensor::try_new(output, input.shape())?)
    }

    /// dx = γ·inv_std/M · (M·dy − Σdy − x̂·Σ(dy·x̂))
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::NoForwardCache(self.name.clone()))?;
        let x_hat_tensor = &cache.x_hat;
        if grad_output.shape() != x_hat_tensor.shape() {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: x_hat_tensor.shape().to_vec(),
                got: grad_output.shape().to_vec(),
            });
        }
        let (batch_size, spatial) = self.check_input(x_hat_tensor.shape())?;
        let channels = self.channels;
        let count = (batch_size * spatial) as f32;
        let x_hat = x_hat_tensor.as_slice();
        let dy = grad_output.as_slice();

        let mut sum_dy = vec![0.0f32; channels];
        let mut sum_dy_xhat = vec![0.0f32; channels];
        for b in 0..batch_size {
            for c in 0..channels {
                let start = (b * channels + c) * spatial;
                for i in start..start + spatial {
                    sum_dy[c] += dy[i];
                    sum_dy_xhat[c] += dy[i] * x_hat[i];
                }
            }
        }

        let mut dx = vec![0.0f32; dy.len()];
        for b in 0..batch_size {
            for c in 0..channels {
                let scale = self.gamma_at(c) * cache.inv_std[c];
                let start = (b * channels + c) * spatial;
                for i in start..start + spatial {
                    dx[i] = scale / count * (count * dy[i] - sum_dy[c] - x_hat[i] * sum_dy_xhat[c]);
                }
            }
        }

        let dx = Tensor::try_new(dx, grad_output.shape())?;
        let gamma_grad = if self.fix_gamma {
            Tensor::zeros(&[channels])
        } else {
            Tensor::try_new(sum_dy_xhat, &[channels])?
        };
        *self.gamma.grad_mut() = gamma_grad;
        *self.beta.grad_mut() = Tensor::try_new(sum_dy, &[channels])?;
        Ok(dx)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        self.check_input(input_shape)?;
        Ok(input_shape.to_vec())
    }

    fn params(&self) -> Vec<&Param> {
        vec![&self.gamma, &self.beta]
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }

    fn aux_states(&self) -> Vec<&Param> {
        vec![&self.moving_mean, &self.moving_var]
    }

    fn aux_states_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.moving_mean, &mut self.moving_var]
    }
}
