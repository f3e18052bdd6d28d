use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{DataBatch, DataIter};
use crate::tensor::Tensor;

/// 高斯噪声迭代器：每次产出一批 N(0, 1) 噪声，形状 [batch_size, z_dim]
///
/// 永不耗尽；`reset()` 不做任何事（随机数流不回退）。
pub struct RandIter {
    batch_size: usize,
    z_dim: usize,
    rng: StdRng,
}

impl RandIter {
    pub fn new(batch_size: usize, z_dim: usize, seed: u64) -> Self {
        Self {
            batch_size,
            z_dim,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DataIter for RandIter {
    fn provide_data(&self) -> Vec<usize> {
        vec![self.batch_size, self.z_dim]
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn reset(&mut self) {}

    fn next_batch(&mut self) -> Option<DataBatch> {
        let noise = Tensor::new_normal_with_rng(0.0, 1.0, &self.provide_data(), &mut self.rng);
        Some(DataBatch::new(noise))
    }
}
