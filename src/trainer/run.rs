use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use super::{TrainError, TrainSummary, train};
use crate::checkpoint::FileCheckpointSink;
use crate::config::{Config, ConfigError};
use crate::data::{DataIter, NdArrayIter, RandIter, load_mnist};
use crate::logger::create_logger;
use crate::models::dcgan;
use crate::tensor::Tensor;

/// 按配置完成一次完整训练：校验配置 → 日志 → 数据 → 模块 → 训练循环
///
/// 配置或设备不合法时在创建任何目录、读取任何数据之前返回错误。
pub fn run(config: &Config, cfg_path: &Path) -> Result<TrainSummary, TrainError> {
    config.validate()?;
    let device = config.device_id()?;

    let paths = create_logger(&config.output_path, cfg_path)?;
    info!("训练配置:\n{}", serde_json::to_string_pretty(config)?);
    info!(
        "设备: {}, 随机种子: {}, 输出目录: {:?}",
        device, config.rng_seed, paths.final_output_path
    );

    let train_data = load_train_data(config)?;
    info!("训练样本: {:?}", train_data.shape());

    let mut train_iter = NdArrayIter::new(
        train_data,
        config.train.batch_size,
        config.train.last_batch,
    )?;
    info!(
        "批大小 {}，每个 epoch {} 个批",
        config.train.batch_size,
        train_iter.num_batches()
    );
    let mut rand_iter = RandIter::new(
        config.train.batch_size,
        config.network.z_dim,
        config.rng_seed.wrapping_add(1),
    );

    let mut rng = StdRng::seed_from_u64(config.rng_seed);
    let (mut generator, mut discriminator) =
        dcgan::build_modules(config, &train_iter.provide_data(), &mut rng)?;

    let mut sink = FileCheckpointSink::new(
        &paths.final_output_path,
        &config.train.model_prefix,
        &config.dataset.dataset,
    )?;

    let summary = train(
        config,
        &mut generator,
        &mut discriminator,
        &mut train_iter,
        &mut rand_iter,
        &mut sink,
    )?;
    info!(
        "训练结束: {} 个 epoch, {} 个批",
        summary.epochs, summary.batches
    );
    Ok(summary)
}

fn load_train_data(config: &Config) -> Result<Tensor, TrainError> {
    let train = match config.dataset.dataset.as_str() {
        "mnist" => load_mnist(&config.dataset.root_path, config.rng_seed)?.train,
        other => return Err(ConfigError::UnsupportedDataset(other.to_string()).into()),
    };
    Ok(match config.dataset.num_samples {
        Some(n) if n < train.shape()[0] => {
            let indices: Vec<usize> = (0..n).collect();
            train.select_samples(&indices)
        }
        _ => train,
    })
}
