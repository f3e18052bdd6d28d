/*
 * @Description  : 负责神经网络（neural network）的构建：参数、层、输出头、初始化器与优化器
 */

mod error;
pub mod init;
pub mod layer;
pub mod loss;
pub mod optimizer;
mod param;

pub use error::NnError;
pub use init::{Initializer, Normal};
pub use layer::{
    BatchNorm, Conv2d, ConvGeometry, ConvTranspose2d, Flatten, Layer, LeakyRelu, Linear, Relu,
    Reshape, Sequential, Tanh,
};
pub use loss::LogisticRegressionOutput;
pub use optimizer::{Adam, AdamConfig, Optimizer};
pub use param::{Param, ParamKind};

#[cfg(test)]
mod tests;
