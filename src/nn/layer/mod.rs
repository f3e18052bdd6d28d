/*
 * @Description  : 网络层。每个层自行实现前向与（手写的）反向传播，
 *                 训练模式下的前向会缓存反向所需的中间量；反向会“写入”（而非累加）参数梯度。
 */

mod activation;
mod batch_norm;
mod conv2d;
mod conv_transpose2d;
mod linear;
mod reshape;
mod sequential;

pub use activation::{LeakyRelu, Relu, Tanh, sigmoid};
pub use batch_norm::BatchNorm;
pub use conv2d::{Conv2d, ConvGeometry};
pub use conv_transpose2d::ConvTranspose2d;
pub use linear::Linear;
pub use reshape::{Flatten, Reshape};
pub use sequential::Sequential;

use crate::nn::{NnError, Param};
use crate::tensor::Tensor;

/// 层 trait
///
/// # 约定
/// - 所有输入输出均为批在前格式，第0维是批大小
/// - `backward()`必须在一次`is_train == true`的`forward()`之后调用
/// - `backward()`写入本层参数的梯度，并返回对输入的梯度
pub trait Layer: Send {
    /// 层名称（也作为参数名前缀）
    fn name(&self) -> &str;

    /// 前向传播
    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError>;

    /// 反向传播：由输出梯度求参数梯度与输入梯度
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError>;

    /// 由输入形状推断输出形状（用于模块绑定时的形状检查）
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError>;

    /// 可训练参数
    fn params(&self) -> Vec<&Param> {
        Vec::new()
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        Vec::new()
    }

    /// 辅助状态（如 BatchNorm 的滑动统计量）：随参数一同保存，但不由优化器更新
    fn aux_states(&self) -> Vec<&Param> {
        Vec::new()
    }

    fn aux_states_mut(&mut self) -> Vec<&mut Param> {
        Vec::new()
    }
}

/// 检查输入的维数（及可选的通道数），不满足则返回形状错误
pub(crate) fn expect_rank(
    layer: &str,
    shape: &[usize],
    rank: usize,
    channels: Option<usize>,
) -> Result<(), NnError> {
    let rank_ok = shape.len() == rank;
    let channels_ok = channels.is_none_or(|c| shape.get(1) == Some(&c));
    if rank_ok && channels_ok {
        return Ok(());
    }
    let mut expected = vec![0; rank];
    if let (Some(c), Some(slot)) = (channels, expected.get_mut(1)) {
        *slot = c;
    }
    Err(NnError::ShapeMismatch {
        layer: layer.to_string(),
        expected,
        got: shape.to_vec(),
    })
}

/// 取出训练前向时缓存的张量；没有缓存说明调用顺序有误
pub(crate) fn cached<'a>(layer: &str, cache: &'a Option<Tensor>) -> Result<&'a Tensor, NnError> {
    cache
        .as_ref()
        .ok_or_else(|| NnError::NoForwardCache(layer.to_string()))
}
