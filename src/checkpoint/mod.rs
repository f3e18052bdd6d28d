/*
 * @Description  : 每个 epoch 结束时的落盘：两个模块的参数文件与一张生成/真实对比图
 */

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::module::TrainableModule;
use crate::nn::NnError;
use crate::tensor::Tensor;
use crate::vision::{Vision, VisionError};


#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("保存模块参数失败: {0}")]
    Module(#[from] NnError),

    #[error("保存对比图失败: {0}")]
    Figure(#[from] VisionError),

    #[error("创建目录失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 检查点接收端
pub trait CheckpointSink {
    /// `epoch` 为从1开始的编号（即完成的 epoch 数）
    fn save_epoch(
        &mut self,
        epoch: usize,
        generator: &dyn TrainableModule,
        discriminator: &dyn TrainableModule,
        fake: &Tensor,
        real: &Tensor,
    ) -> Result<(), CheckpointError>;
}

/// 写入本地文件：
/// - `<dir>/<prefix>-generator-%04d.params`
/// - `<dir>/<prefix>-discriminator-%04d.params`
/// - `<dir>/train_fig/<dataset>-train-%04d.png`
#[derive(Debug, Clone)]
pub struct FileCheckpointSink {
    prefix: PathBuf,
    train_fig_prefix: PathBuf,
}

impl FileCheckpointSink {
    /// 创建 `train_fig` 子目录
    pub fn new(
        final_output_path: &Path,
        model_prefix: &str,
        dataset: &str,
    ) -> Result<Self, CheckpointError> {
        let train_fig_path = final_output_path.join("train_fig");
        std::fs::create_dir_all(&train_fig_path)?;
        Ok(Self {
            prefix: final_output_path.join(model_prefix),
            train_fig_prefix: train_fig_path.join(dataset),
        })
    }

    fn tagged(prefix: &Path, suffix: &str) -> PathBuf {
        let mut name = prefix.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn generator_path(&self, epoch: usize) -> PathBuf {
        Self::tagged(&self.prefix, &format!("-generator-{epoch:04}.params"))
    }

    pub fn discriminator_path(&self, epoch: usize) -> PathBuf {
        Self::tagged(&self.prefix, &format!("-discriminator-{epoch:04}.params"))
    }

    pub fn figure_path(&self, epoch: usize) -> PathBuf {
        Self::tagged(&self.train_fig_prefix, &format!("-train-{epoch:04}.png"))
    }
}

impl CheckpointSink for FileCheckpointSink {
    fn save_epoch(
        &mut self,
        epoch: usize,
        generator: &dyn TrainableModule,
        discriminator: &dyn TrainableModule,
        fake: &Tensor,
        real: &Tensor,
    ) -> Result<(), CheckpointError> {
        info!("Saving...");
        Vision::save_comparison(fake, real, &self.figure_path(epoch))?;
        generator.save_params(&self.generator_path(epoch))?;
        discriminator.save_params(&self.discriminator_path(epoch))?;
        Ok(())
    }
}
