//! 训练引擎（层、优化器、可训练模块）的错误类型

use thiserror::Error;

use crate::errors::TensorError;
use crate::metric::MetricError;

/// 引擎运行期错误
#[derive(Debug, Error)]
pub enum NnError {
    /// 输入形状与层/模块所期望的不符
    #[error("{layer}: 形状不匹配，期望 {expected:?}，实际 {got:?}")]
    ShapeMismatch {
        layer: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// 反向传播前没有可用的前向缓存
    #[error("{0}: 反向传播前必须先以训练模式执行前向传播")]
    NoForwardCache(String),

    /// 模块生命周期调用顺序错误（如未绑定就前向）
    #[error("{module}: {message}")]
    InvalidState { module: String, message: String },

    /// 梯度集合与参数不对应
    #[error("{module}: 梯度集合不匹配：{message}")]
    GradientMismatch { module: String, message: String },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("参数文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("参数文件（反）序列化失败: {0}")]
    Serialization(String),
}
