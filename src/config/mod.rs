/*
 * @Description  : 训练配置。YAML 文件覆盖内置默认值，加载后不可变，按引用传递。
 *
 * ```yaml
 * gpus: "0"
 * rng_seed: 3
 * output_path: ./output/dcgan
 * default: { frequent: 20 }
 * dataset: { dataset: mnist, root_path: ./data/mnist }
 * network: { z_dim: 100, ngf: 64, ndf: 64, sigma: 0.02 }
 * train: { batch_size: 64, lr: 0.0002, beta1: 0.5, end_epoch: 25, model_prefix: dcgan }
 * ```
 */

mod error;


use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

use crate::data::LastBatchHandle;

/// 目前唯一支持的数据集
pub const SUPPORTED_DATASET: &str = "mnist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 逗号分隔的设备编号，必须恰好一个
    pub gpus: String,
    pub rng_seed: u64,
    pub output_path: PathBuf,
    pub default: DefaultConfig,
    pub dataset: DatasetConfig,
    pub network: NetworkConfig,
    pub train: TrainConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultConfig {
    /// 每多少个批打印一次日志
    pub frequent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub dataset: String,
    pub root_path: PathBuf,
    /// 只取训练集的前 N 个样本（用于快速试跑）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_samples: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 噪声维度 Z
    pub z_dim: usize,
    /// 生成器基础通道数
    pub ngf: usize,
    /// 判别器基础通道数
    pub ndf: usize,
    /// 权重初始化的标准差
    pub sigma: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub batch_size: usize,
    pub lr: f32,
    pub beta1: f32,
    pub end_epoch: usize,
    pub model_prefix: String,
    pub last_batch: LastBatchHandle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpus: "0".to_string(),
            rng_seed: 3,
            output_path: PathBuf::from("./output/dcgan"),
            default: DefaultConfig::default(),
            dataset: DatasetConfig::default(),
            network: NetworkConfig::default(),
            train: TrainConfig::default(),
        }
    }
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self { frequent: 20 }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset: SUPPORTED_DATASET.to_string(),
            root_path: PathBuf::from("./data/mnist"),
            num_samples: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            z_dim: 100,
            ngf: 64,
            ndf: 64,
            sigma: 0.02,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            lr: 0.0002,
            beta1: 0.5,
            end_epoch: 25,
            model_prefix: "dcgan".to_string(),
            last_batch: LastBatchHandle::Pad,
        }
    }
}

impl Config {
    /// 读取并校验 YAML 配置文件
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 仅解析，不校验；缺失的键取默认值
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// 解析设备列表
    pub fn device_ids(&self) -> Result<Vec<usize>, ConfigError> {
        self.gpus
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| ConfigError::InvalidDevice(s.to_string()))
            })
            .collect()
    }

    /// 唯一的设备编号
    pub fn device_id(&self) -> Result<usize, ConfigError> {
        match self.device_ids()?.as_slice() {
            [id] => Ok(*id),
            ids => Err(ConfigError::DeviceCount {
                count: ids.len(),
                gpus: self.gpus.clone(),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset.dataset != SUPPORTED_DATASET {
            return Err(ConfigError::UnsupportedDataset(self.dataset.dataset.clone()));
        }
        self.device_id()?;

        let positive = [
            ("default.frequent", self.default.frequent),
            ("train.batch_size", self.train.batch_size),
            ("train.end_epoch", self.train.end_epoch),
            ("network.z_dim", self.network.z_dim),
            ("network.ngf", self.network.ngf),
            ("network.ndf", self.network.ndf),
            ("dataset.num_samples", self.dataset.num_samples.unwrap_or(1)),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: "必须大于0".to_string(),
                });
            }
        }
        if !(self.train.lr > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "train.lr",
                message: format!("学习率必须为正数，实际为 {}", self.train.lr),
            });
        }
        if !(0.0..1.0).contains(&self.train.beta1) {
            return Err(ConfigError::InvalidValue {
                key: "train.beta1",
                message: format!("必须在 [0, 1) 内，实际为 {}", self.train.beta1),
            });
        }
        if !(self.network.sigma > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "network.sigma",
                message: format!("必须为正数，实际为 {}", self.network.sigma),
            });
        }
        if self.train.model_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "train.model_prefix",
                message: "不能为空".to_string(),
            });
        }
        Ok(())
    }
}
