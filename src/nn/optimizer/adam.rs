/*
 * @Description  : Adam优化器实现
 *
 * 更新规则：
 *   g     = rescale_grad * grad + wd * w
 *   m     = β1 * m + (1 - β1) * g
 *   v     = β2 * v + (1 - β2) * g²
 *   lr_t  = lr * √(1 - β2ᵗ) / (1 - β1ᵗ)
 *   w     = w - lr_t * m / (√v + ε)
 */

use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::nn::{NnError, Param};
use crate::tensor::Tensor;

/// Adam 的超参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    /// 权重衰减系数
    pub wd: f32,
    /// 梯度缩放系数（通常为 1 / batch_size）
    pub rescale_grad: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            wd: 0.0,
            rescale_grad: 1.0,
        }
    }
}

/// Adam优化器
pub struct Adam {
    config: AdamConfig,
    /// 一阶矩估计（按参数顺序）
    m: Vec<Tensor>,
    /// 二阶矩估计（按参数顺序）
    v: Vec<Tensor>,
    /// 时间步
    t: usize,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// 已执行的更新步数
    pub fn num_update(&self) -> usize {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Param]) -> Result<(), NnError> {
        if self.m.is_empty() {
            self.m = params.iter().map(|p| Tensor::zeros(p.shape())).collect();
            self.v = params.iter().map(|p| Tensor::zeros(p.shape())).collect();
        }
        if self.m.len() != params.len() {
            return Err(NnError::InvalidState {
                module: "adam".to_string(),
                message: format!(
                    "参数个数从 {} 变为 {}，优化器状态无法对应",
                    self.m.len(),
                    params.len()
                ),
            });
        }

        self.t += 1;
        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            wd,
            rescale_grad,
        } = self.config;
        let t = self.t as i32;
        let lr_t = learning_rate * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));

        for ((param, m), v) in params.iter_mut().zip(&mut self.m).zip(&mut self.v) {
            if !m.is_same_shape(param.value()) || !param.grad().is_same_shape(param.value()) {
                return Err(NnError::ShapeMismatch {
                    layer: param.name().to_string(),
                    expected: m.shape().to_vec(),
                    got: param.grad().shape().to_vec(),
                });
            }
            let (value, grad) = param.value_and_grad_mut();
            let weights = value.as_slice_mut();
            let grads = grad.as_slice();
            let means = m.as_slice_mut();
            let vars = v.as_slice_mut();
            for i in 0..weights.len() {
                let g = rescale_grad * grads[i] + wd * weights[i];
                means[i] = beta1 * means[i] + (1.0 - beta1) * g;
                vars[i] = beta2 * vars[i] + (1.0 - beta2) * g * g;
                weights[i] -= lr_t * means[i] / (vars[i].sqrt() + epsilon);
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.config.learning_rate
    }
}
