/*
 * @Description  : DCGAN 端到端集成测试：手写的小 MNIST 文件 + 很窄的网络，
 *                 验证配置 → 数据 → 模块 → 训练 → 落盘整条链路
 */

use std::fs;
use std::path::Path;

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;

use only_dcgan::checkpoint::FileCheckpointSink;
use only_dcgan::data::{DataIter, LastBatchHandle, NdArrayIter, RandIter};
use only_dcgan::models::dcgan;
use only_dcgan::module::NetModule;
use only_dcgan::nn::ParamKind;
use only_dcgan::tensor::Tensor;
use only_dcgan::{Config, run, train};

fn idx_images(count: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [2051u32, count as u32, 28, 28] {
        bytes.extend_from_slice(&field.to_be_bytes());
    }
    for i in 0..count * 28 * 28 {
        bytes.push((i * 37 % 256) as u8);
    }
    bytes
}

fn idx_labels(count: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [2049u32, count as u32] {
        bytes.extend_from_slice(&field.to_be_bytes());
    }
    bytes.extend((0..count).map(|i| (i % 10) as u8));
    bytes
}

/// 6 张训练图 + 2 张测试图，合并后共 8 张
fn write_tiny_mnist(root: &Path) -> Result<()> {
    fs::create_dir_all(root)?;
    fs::write(root.join("train-images-idx3-ubyte"), idx_images(6))?;
    fs::write(root.join("train-labels-idx1-ubyte"), idx_labels(6))?;
    fs::write(root.join("t10k-images-idx3-ubyte"), idx_images(2))?;
    fs::write(root.join("t10k-labels-idx1-ubyte"), idx_labels(2))?;
    Ok(())
}

fn tiny_yaml(data_root: &Path, output: &Path) -> String {
    format!(
        r#"
gpus: "0"
rng_seed: 5
output_path: {output}
default: {{ frequent: 1 }}
dataset: {{ dataset: mnist, root_path: {root} }}
network: {{ z_dim: 8, ngf: 2, ndf: 2, sigma: 0.02 }}
train: {{ batch_size: 4, end_epoch: 1, model_prefix: tiny }}
"#,
        output = output.display(),
        root = data_root.display()
    )
}

#[test]
fn test_run_on_tiny_mnist_writes_checkpoints() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let data_root = dir.path().join("mnist");
    let output = dir.path().join("output");
    write_tiny_mnist(&data_root)?;

    let cfg_path = dir.path().join("tiny_mnist.yaml");
    fs::write(&cfg_path, tiny_yaml(&data_root, &output))?;
    let config = Config::load(&cfg_path)?;
    assert_eq!(config.train.batch_size, 4);
    // 未写出的键取默认值
    assert_eq!(config.train.last_batch, LastBatchHandle::Pad);

    let summary = run(&config, &cfg_path)?;
    assert_eq!(summary.epochs, 1);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.d_acc.num_inst, 2 * 2 * 4);
    assert_eq!(summary.g_ce.num_inst, 2 * 4);

    let run_dir = output.join("tiny_mnist");
    assert!(run_dir.join("tiny-generator-0001.params").is_file());
    assert!(run_dir.join("tiny-discriminator-0001.params").is_file());
    assert!(run_dir.join("train_fig").join("mnist-train-0001.png").is_file());
    assert!(!run_dir.join("tiny-generator-0002.params").exists());

    let log_files: Vec<_> = fs::read_dir(&run_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "log"))
        .collect();
    assert_eq!(log_files.len(), 1);

    // 保存的参数能被同构的新模块读回
    let mut rng = StdRng::seed_from_u64(0);
    let (mut generator, mut discriminator) =
        dcgan::build_modules(&config, &[4, 1, 28, 28], &mut rng)?;
    generator.load_params(&run_dir.join("tiny-generator-0001.params"))?;
    discriminator.load_params(&run_dir.join("tiny-discriminator-0001.params"))?;
    Ok(())
}

/// 所有权重（不含固定为 1 的 BatchNorm gamma）的当前值
fn weights(module: &NetModule) -> Vec<Tensor> {
    module
        .params()
        .iter()
        .filter(|p| p.kind() == ParamKind::Weight)
        .map(|p| p.value().clone())
        .collect()
}

#[test]
fn test_real_modules_train_one_epoch_in_memory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = Config::default();
    config.network.z_dim = 8;
    config.network.ngf = 2;
    config.network.ndf = 2;
    config.train.batch_size = 2;
    config.train.end_epoch = 1;
    config.default.frequent = 1;

    let images = Tensor::new_normal(0.0, 0.5, &[5, 1, 28, 28]).map(|v| v.clamp(-1.0, 1.0));
    let mut train_iter = NdArrayIter::new(images, 2, LastBatchHandle::Pad)?;
    let mut rand_iter = RandIter::new(2, 8, 11);
    let mut rng = StdRng::seed_from_u64(config.rng_seed);
    let (mut generator, mut discriminator) =
        dcgan::build_modules(&config, &train_iter.provide_data(), &mut rng)?;
    let mut sink = FileCheckpointSink::new(dir.path(), "dcgan", "mnist")?;

    let g_before = weights(&generator);
    let d_before = weights(&discriminator);
    let summary = train(
        &config,
        &mut generator,
        &mut discriminator,
        &mut train_iter,
        &mut rand_iter,
        &mut sink,
    )?;

    // 5 个样本、批大小 2、末批补齐：3 个批
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.d_ce.num_inst, 2 * 3 * 2);
    assert!(summary.g_ce.value.is_finite() && summary.d_ce.value.is_finite());
    assert!((0.0..=1.0).contains(&summary.d_acc.value));

    // 每个权重都被更新过
    assert!(!g_before.is_empty() && !d_before.is_empty());
    for (before, after) in g_before.iter().zip(weights(&generator).iter()) {
        assert_eq!(before.shape(), after.shape());
        assert_ne!(before, after);
    }
    for (before, after) in d_before.iter().zip(weights(&discriminator).iter()) {
        assert_ne!(before, after);
    }
    assert_eq!(generator.optimizer().map(|adam| adam.num_update()), Some(3));
    assert_eq!(discriminator.optimizer().map(|adam| adam.num_update()), Some(3));

    assert!(sink.generator_path(1).is_file());
    assert!(sink.figure_path(1).is_file());
    Ok(())
}
