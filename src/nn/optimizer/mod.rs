/*
 * @Description  : 优化器模块
 */

mod adam;

pub use adam::{Adam, AdamConfig};

use crate::nn::{NnError, Param};

/// 优化器核心 trait
///
/// 优化器只负责“用已算好的梯度更新参数”，不做前向/反向：
/// ```ignore
/// module.forward(&batch, true)?;
/// module.backward(None)?;
/// optimizer.step(&mut params)?; // ← 只更新参数
/// ```
pub trait Optimizer {
    /// 参数更新（使用参数上已有的梯度）。`params`的顺序在多次调用间必须保持一致
    fn step(&mut self, params: &mut [&mut Param]) -> Result<(), NnError>;

    /// 获取学习率
    fn learning_rate(&self) -> f32;
}
