//! 数据加载模块
//!
//! 提供训练所需的两类数据源，二者都实现 [`DataIter`]：
//!
//! - [`NdArrayIter`]: 对内存中整块数据按批迭代（末批可补齐或丢弃）
//! - [`RandIter`]: 无限的高斯噪声批，作为生成器输入
//! - [`datasets`]: 数据集读取（MNIST IDX 格式）
//! - [`transforms`]: 像素缩放与样本打乱
//! - [`DataError`]: 数据加载错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use only_dcgan::data::{DataIter, LastBatchHandle, NdArrayIter};
//!
//! let mut train_iter = NdArrayIter::new(train_x, 64, LastBatchHandle::Pad)?;
//! for epoch in 0..end_epoch {
//!     train_iter.reset();
//!     while let Some(batch) = train_iter.next_batch() {
//!         // ...
//!     }
//! }
//! ```

mod batch;
pub mod datasets;
pub mod error;
mod iter;
mod rand_iter;
pub mod transforms;


pub use batch::DataBatch;
pub use datasets::{MnistSplit, load_mnist};
pub use error::DataError;
pub use iter::{DataIter, LastBatchHandle, NdArrayIter};
pub use rand_iter::RandIter;
