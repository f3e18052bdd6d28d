use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug)]
pub enum TensorError {
    // 构造张量用
    #[error("数据长度{len}与形状{shape:?}所需的元素个数{expected}不一致")]
    DataLengthMismatch {
        len: usize,
        shape: Vec<usize>,
        expected: usize,
    },
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },

    #[error("张量形状不兼容：无法将形状{from:?}变为{to:?}")]
    IncompatibleShape { from: Vec<usize>, to: Vec<usize> },
}
