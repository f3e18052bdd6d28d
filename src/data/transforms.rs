//! 数据变换函数

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::tensor::Tensor;

/// 将 0-255 像素值线性映射到 [-1, 1]：x / 127.5 - 1（与生成器的 tanh 输出范围一致）
pub fn scale_pixels_symmetric(tensor: &Tensor) -> Tensor {
    tensor.map(|x| x / 127.5 - 1.0)
}

/// 用给定种子生成 0..n 的一个随机排列
pub fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    indices
}
