use super::Tensor;
use std::ops::{Index, IndexMut};

// 引用式索引，如`tensor[[b, c, h, w]]`
impl<const N: usize> Index<[usize; N]> for Tensor {
    type Output = f32;

    fn index(&self, index: [usize; N]) -> &f32 {
        &self.data[&index[..]]
    }
}

impl<const N: usize> IndexMut<[usize; N]> for Tensor {
    fn index_mut(&mut self, index: [usize; N]) -> &mut f32 {
        &mut self.data[&index[..]]
    }
}

// 沿第0维（批维度）的克隆式切取
impl Tensor {
    /// 按给定的样本索引（可重复、可乱序）在第0维上收集出新张量
    pub fn select_samples(&self, indices: &[usize]) -> Tensor {
        Tensor::from_array(self.data.select(ndarray::Axis(0), indices))
    }
}
