/*
 * @Description  : 批数据迭代器
 *
 * 与 DataLoader 的“for 循环”风格不同，训练循环需要在 epoch 之间显式 reset，
 * 并且末批的处理方式（补齐/丢弃）由配置决定。
 */

use serde::{Deserialize, Serialize};

use super::{DataBatch, DataError};
use crate::tensor::Tensor;

/// 批数据迭代器 trait
///
/// 一个 epoch 内惰性地产出批，`next_batch()` 返回 `None` 表示本轮结束，
/// `reset()` 后可重新开始。
pub trait DataIter {
    /// 每个批的数据形状（含批维度）
    fn provide_data(&self) -> Vec<usize>;

    fn batch_size(&self) -> usize;

    fn reset(&mut self);

    fn next_batch(&mut self) -> Option<DataBatch>;
}

/// 数据量不是批大小的整数倍时，最后一个不完整批的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastBatchHandle {
    /// 从数据开头回绕补齐，并在 `DataBatch::pad` 中记录补了几个
    #[default]
    Pad,
    /// 直接丢弃
    Discard,
}

/// 内存数据迭代器：第0维为样本
///
/// # 示例
/// ```ignore
/// let mut iter = NdArrayIter::new(images, 64, LastBatchHandle::Pad)?;
/// while let Some(batch) = iter.next_batch() {
///     assert_eq!(batch.data.shape()[0], 64);
/// }
/// ```
pub struct NdArrayIter {
    data: Tensor,
    batch_size: usize,
    last_batch: LastBatchHandle,
    cursor: usize,
}

impl NdArrayIter {
    pub fn new(
        data: Tensor,
        batch_size: usize,
        last_batch: LastBatchHandle,
    ) -> Result<Self, DataError> {
        let num_samples = data.shape().first().copied().unwrap_or(0);
        if batch_size == 0 || num_samples == 0 || data.dimension() < 2 {
            return Err(DataError::InvalidBatch {
                batch_size,
                num_samples,
            });
        }
        Ok(Self {
            data,
            batch_size,
            last_batch,
            cursor: 0,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.data.shape()[0]
    }

    /// 每个 epoch 的批数
    pub fn num_batches(&self) -> usize {
        let n = self.num_samples();
        match self.last_batch {
            LastBatchHandle::Pad => n.div_ceil(self.batch_size),
            LastBatchHandle::Discard => n / self.batch_size,
        }
    }
}

impl DataIter for NdArrayIter {
    fn provide_data(&self) -> Vec<usize> {
        let mut shape = self.data.shape().to_vec();
        shape[0] = self.batch_size;
        shape
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_batch(&mut self) -> Option<DataBatch> {
        let n = self.num_samples();
        let start = self.cursor;
        if start >= n {
            return None;
        }
        let end = start + self.batch_size;
        let pad = end.saturating_sub(n);
        if pad > 0 && self.last_batch == LastBatchHandle::Discard {
            self.cursor = n;
            return None;
        }
        self.cursor = end;

        // 补齐时回绕到数据开头取样本
        let indices: Vec<usize> = (start..end).map(|i| i % n).collect();
        let mut batch = DataBatch::new(self.data.select_samples(&indices));
        batch.pad = pad;
        Some(batch)
    }
}
