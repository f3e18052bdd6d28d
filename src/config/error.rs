//! 配置错误类型定义

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("不支持的数据集: {0}（目前仅支持 mnist）")]
    UnsupportedDataset(String),

    #[error("只支持单个设备，实际配置了 {count} 个: {gpus:?}")]
    DeviceCount { count: usize, gpus: String },

    #[error("无法解析设备编号: {0:?}")]
    InvalidDevice(String),

    #[error("配置项 {key} 非法: {message}")]
    InvalidValue { key: &'static str, message: String },
}
