/*
 * @Description  : 可训练参数（及辅助状态）：值与梯度成对存放，由所属的层持有
 */

use crate::tensor::Tensor;

/// 参数的种类，决定初始化方式以及是否参与优化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Weight,
    Bias,
    /// BatchNorm 的缩放系数
    Gamma,
    /// BatchNorm 的平移系数
    Beta,
    /// BatchNorm 的滑动均值（辅助状态，不参与优化）
    MovingMean,
    /// BatchNorm 的滑动方差（辅助状态，不参与优化）
    MovingVar,
}

/// 一个具名参数
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    kind: ParamKind,
    value: Tensor,
    grad: Tensor,
}

impl Param {
    /// 以全0值创建参数，真正的初始值由初始化器给出
    pub fn new(name: impl Into<String>, kind: ParamKind, shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            kind,
            value: Tensor::zeros(shape),
            grad: Tensor::zeros(shape),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }

    pub fn grad(&self) -> &Tensor {
        &self.grad
    }

    pub fn grad_mut(&mut self) -> &mut Tensor {
        &mut self.grad
    }

    /// 同时借出值（可写）和梯度（只读），供优化器原地更新
    pub fn value_and_grad_mut(&mut self) -> (&mut Tensor, &Tensor) {
        (&mut self.value, &self.grad)
    }
}
