use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::data::DataError;
use crate::nn::NnError;

/// 训练过程中的所有错误
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("数据错误: {0}")]
    Data(#[from] DataError),

    #[error("模块错误: {0}")]
    Module(#[from] NnError),

    #[error("检查点错误: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置序列化失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("第 {epoch} 个 epoch 没有产出任何批（样本数少于批大小且末批被丢弃）")]
    EmptyEpoch { epoch: usize },

    #[error("噪声迭代器提前耗尽")]
    NoiseExhausted,
}
