use super::add::assert_same_shape;
use crate::errors::Operator;
use crate::tensor::Tensor;
use std::ops::Sub;

impl<'b> Sub<&'b Tensor> for &Tensor {
    type Output = Tensor;

    fn sub(self, other: &'b Tensor) -> Tensor {
        assert_same_shape(self, other, Operator::Sub);
        Tensor {
            data: &self.data - &other.data,
        }
    }
}

impl Sub<f32> for &Tensor {
    type Output = Tensor;

    fn sub(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data - scalar,
        }
    }
}
