//! # Only DCGAN
//!
//! 用纯rust张量引擎训练[DCGAN](https://arxiv.org/abs/1511.06434)：
//! 生成器把噪声映射为图像，判别器区分真假，二者逐批交替优化。
//!
//! 模块分层：`tensor` → `nn`（层、输出头、初始化、Adam）→ `module`（可训练模块）
//! → `trainer`（训练循环）；`data`、`metric`、`checkpoint`、`vision`、`config`、`logger`
//! 为训练循环提供数据、指标、落盘与配置。

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod errors;
pub mod logger;
pub mod metric;
pub mod models;
pub mod module;
pub mod nn;
pub mod tensor;
pub mod trainer;
pub mod vision;

pub use config::Config;
pub use trainer::{TrainError, TrainSummary, run, train};
