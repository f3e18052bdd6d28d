/*
 * @Description  : DCGAN 训练循环
 *
 * 每个批严格按以下顺序：
 * 1. 生成器前向一次得到 outG（本批内复用）
 * 2. 标签置0，判别器在 outG 上前向+反向，保存梯度快照 gradD
 * 3. 标签置1，判别器在真实批上前向+反向，梯度 += gradD，判别器更新一次
 * 4. 标签置1，判别器在 outG 上前向+反向，把对输入的梯度传给生成器反向，生成器更新
 */

mod error;
mod run;

#[cfg(test)]
mod tests;

use serde::Serialize;
use tracing::info;

pub use error::TrainError;
pub use run::run;

use crate::checkpoint::CheckpointSink;
use crate::config::Config;
use crate::data::{DataBatch, DataIter};
use crate::metric::{AccMetric, CrossEntropyMetric, EvalMetric};
use crate::module::TrainableModule;
use crate::tensor::Tensor;

/// 某个指标在最后一个 epoch 结束时的读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReading {
    pub value: f64,
    pub num_inst: usize,
}

impl MetricReading {
    fn of(metric: &dyn EvalMetric) -> Self {
        Self {
            value: metric.get().1,
            num_inst: metric.num_inst(),
        }
    }
}

/// 训练结果摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainSummary {
    pub epochs: usize,
    /// 所有 epoch 的批数之和
    pub batches: usize,
    pub d_acc: MetricReading,
    pub g_ce: MetricReading,
    pub d_ce: MetricReading,
}

/// 每个 epoch 重置的三个指标：判别器准确率、生成器交叉熵、判别器交叉熵
#[derive(Default)]
struct EpochMetrics {
    d_acc: AccMetric,
    g_ce: CrossEntropyMetric,
    d_ce: CrossEntropyMetric,
}

impl EpochMetrics {
    fn reset(&mut self) {
        self.d_acc.reset();
        self.g_ce.reset();
        self.d_ce.reset();
    }
}

/// 训练一个批，返回本批的生成结果 outG
fn train_batch<G, D>(
    generator: &mut G,
    discriminator: &mut D,
    mut real: DataBatch,
    noise: &DataBatch,
    label: &mut Tensor,
    metrics: &mut EpochMetrics,
) -> Result<Tensor, TrainError>
where
    G: TrainableModule + ?Sized,
    D: TrainableModule + ?Sized,
{
    generator.forward(noise, true)?;
    let out_g = generator.get_outputs()?.clone();

    // 判别器：假样本
    label.fill(0.0);
    let fake = DataBatch::new(out_g.clone()).with_label(label.clone());
    discriminator.forward(&fake, true)?;
    discriminator.backward(None)?;
    let fake_grads = discriminator.gradients();
    discriminator.update_metric(&mut metrics.d_ce, label)?;
    discriminator.update_metric(&mut metrics.d_acc, label)?;

    // 判别器：真样本，梯度与假样本的相加后只更新一次
    label.fill(1.0);
    real.label = Some(label.clone());
    discriminator.forward(&real, true)?;
    discriminator.backward(None)?;
    let mut grads = discriminator.gradients();
    grads.accumulate(&fake_grads)?;
    discriminator.set_gradients(grads)?;
    discriminator.update()?;
    discriminator.update_metric(&mut metrics.d_ce, label)?;
    discriminator.update_metric(&mut metrics.d_acc, label)?;

    // 生成器：让判别器把 outG 判为真
    label.fill(1.0);
    let fooled = DataBatch::new(out_g.clone()).with_label(label.clone());
    discriminator.forward(&fooled, true)?;
    discriminator.backward(None)?;
    let input_grads = discriminator.get_input_grads()?.clone();
    generator.backward(Some(&input_grads))?;
    generator.update()?;
    discriminator.update_metric(&mut metrics.g_ce, label)?;

    Ok(out_g)
}

/// 完整训练：`config.train.end_epoch` 个 epoch，每个 epoch 结束时写一次检查点
///
/// `train_iter` 产出真实数据批，`rand_iter` 产出生成器的噪声输入。
/// 本函数不校验配置；`default.frequent` 为0时按每批都打印日志处理。
pub fn train<G, D, I, R, S>(
    config: &Config,
    generator: &mut G,
    discriminator: &mut D,
    train_iter: &mut I,
    rand_iter: &mut R,
    sink: &mut S,
) -> Result<TrainSummary, TrainError>
where
    G: TrainableModule,
    D: TrainableModule,
    I: DataIter,
    R: DataIter,
    S: CheckpointSink,
{
    let frequent = config.default.frequent.max(1);
    let mut label = Tensor::zeros(&[train_iter.batch_size()]);
    let mut metrics = EpochMetrics::default();
    let mut total_batches = 0;

    for epoch in 0..config.train.end_epoch {
        train_iter.reset();
        metrics.reset();
        let mut last: Option<(Tensor, Tensor)> = None;
        let mut t = 0;

        while let Some(batch) = train_iter.next_batch() {
            let noise = rand_iter.next_batch().ok_or(TrainError::NoiseExhausted)?;
            let real_data = batch.data.clone();
            let out_g = train_batch(
                generator,
                discriminator,
                batch,
                &noise,
                &mut label,
                &mut metrics,
            )?;

            t += 1;
            if t % frequent == 0 {
                info!(
                    "Epoch[{}] Batch[{}] dACC: {:.4} gCE: {:.4} dCE: {:.4}",
                    epoch,
                    t,
                    metrics.d_acc.get().1,
                    metrics.g_ce.get().1,
                    metrics.d_ce.get().1
                );
            }
            last = Some((out_g, real_data));
        }

        let (fake, real) = last.ok_or(TrainError::EmptyEpoch { epoch })?;
        total_batches += t;
        sink.save_epoch(epoch + 1, &*generator, &*discriminator, &fake, &real)?;
    }

    Ok(TrainSummary {
        epochs: config.train.end_epoch,
        batches: total_batches,
        d_acc: MetricReading::of(&metrics.d_acc),
        g_ce: MetricReading::of(&metrics.g_ce),
        d_ce: MetricReading::of(&metrics.d_ce),
    })
}
