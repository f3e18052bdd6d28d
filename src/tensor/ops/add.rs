/*
 * @Description  : 张量的加法，实现了两个同形张量“逐元素”（或张量与纯数）相加的运算。
 *                 不做广播：形状不一致直接报错。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{Add, AddAssign};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 + f32↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Add<f32> for Tensor {
    type Output = Self;

    fn add(self, scalar: f32) -> Self {
        Self {
            data: self.data + scalar,
        }
    }
}
impl Add<f32> for &Tensor {
    type Output = Tensor;

    fn add(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data + scalar,
        }
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 + f32↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓带引用的张量 + 带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl<'b> Add<&'b Tensor> for &Tensor {
    type Output = Tensor;

    fn add(self, other: &'b Tensor) -> Tensor {
        assert_same_shape(self, other, Operator::Add);
        Tensor {
            data: &self.data + &other.data,
        }
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑带引用的张量 + 带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

impl AddAssign<f32> for Tensor {
    fn add_assign(&mut self, scalar: f32) {
        self.data += scalar;
    }
}

impl<'a> AddAssign<&'a Tensor> for Tensor {
    fn add_assign(&mut self, other: &'a Tensor) {
        assert_same_shape(self, other, Operator::AddAssign);
        self.data += &other.data;
    }
}

impl Tensor {
    /// 逐元素自相加；形状不一致时返回错误而非panic
    pub fn try_add_assign(&mut self, other: &Tensor) -> Result<(), TensorError> {
        if !self.is_same_shape(other) {
            return Err(shape_error(self, other, Operator::AddAssign));
        }
        self.data += &other.data;
        Ok(())
    }
}

pub(in crate::tensor) fn shape_error(
    tensor_1: &Tensor,
    tensor_2: &Tensor,
    operator: Operator,
) -> TensorError {
    TensorError::OperatorError {
        operator,
        tensor1_shape: tensor_1.shape().to_vec(),
        tensor2_shape: tensor_2.shape().to_vec(),
    }
}

/// # Panics
/// 如果两个张量形状不一致
pub(in crate::tensor) fn assert_same_shape(tensor_1: &Tensor, tensor_2: &Tensor, operator: Operator) {
    assert!(
        tensor_1.is_same_shape(tensor_2),
        "{}",
        shape_error(tensor_1, tensor_2, operator)
    );
}
