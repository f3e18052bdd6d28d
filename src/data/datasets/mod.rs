//! 内置数据集
//!
//! - MNIST：手写数字（28x28 灰度图），DCGAN 训练只用图像，不用类别标签

mod mnist;

pub use mnist::{MNIST_TRAIN_SIZE, MnistSplit, load_mnist, parse_idx_images, parse_idx_labels};
