/*
 * @Description  : 参数初始化器
 */

use rand::Rng;

use crate::nn::Param;
use crate::nn::param::ParamKind;
use crate::tensor::Tensor;

/// 参数初始化器 trait：根据参数种类写入初始值，并清零梯度
pub trait Initializer {
    fn init_param<R: Rng + ?Sized>(&self, param: &mut Param, rng: &mut R);
}

/// 正态分布初始化：权重 ~ N(0, σ²)；偏置、beta、滑动均值置0；gamma、滑动方差置1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    pub sigma: f32,
}

impl Normal {
    pub fn new(sigma: f32) -> Self {
        Self { sigma }
    }
}

impl Initializer for Normal {
    fn init_param<R: Rng + ?Sized>(&self, param: &mut Param, rng: &mut R) {
        let shape = param.shape().to_vec();
        let value = match param.kind() {
            ParamKind::Weight => Tensor::new_normal_with_rng(0.0, self.sigma, &shape, rng),
            ParamKind::Bias | ParamKind::Beta | ParamKind::MovingMean => Tensor::zeros(&shape),
            ParamKind::Gamma | ParamKind::MovingVar => Tensor::ones(&shape),
        };
        *param.value_mut() = value;
        *param.grad_mut() = Tensor::zeros(&shape);
    }
}
