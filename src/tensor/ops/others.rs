use crate::tensor::Tensor;
use std::cmp::PartialEq;

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Tensor {
    /// 对张量中的所有元素求和
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 所有元素的算术平均；空张量返回0
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            0.0
        } else {
            self.sum() / self.size() as f32
        }
    }

    /// 逐元素映射，返回新张量
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Tensor {
        Tensor {
            data: self.data.mapv(f),
        }
    }

    /// 将所有元素原地置为`value`（如：标签张量在“真/假”之间切换）
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// 判断所有元素是否都等于`value`
    pub fn all_eq(&self, value: f32) -> bool {
        self.data.iter().all(|&x| x == value)
    }
}
