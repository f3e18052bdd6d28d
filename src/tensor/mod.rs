/*
 * @Description  : 张量（Tensor）：对`ndarray`动态维度数组的薄封装，是整个训练引擎的数值基础。
 *                 约定：所有张量均为“批在前”（batch-first）格式，且内部数据始终保持标准（行优先、连续）内存布局。
 */

use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod ops {
    pub mod add;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

mod index;
mod property;
mod shape;


/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 创建一个张量。`data`的长度必须和`shape`中所有元素的乘积相等（`shape`为`[]`时表示标量，需1个元素），否则panic。
    /// 需要可恢复错误时请使用[`Tensor::try_new`]。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        match Self::try_new(data.to_vec(), shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{}", e),
        }
    }

    /// 与[`Tensor::new`]相同，但以`Result`形式返回长度不匹配的错误，并直接接管`data`的所有权
    pub fn try_new(data: Vec<f32>, shape: &[usize]) -> Result<Tensor, TensorError> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(TensorError::DataLengthMismatch {
                len: data.len(),
                shape: shape.to_vec(),
                expected,
            });
        }
        let data = Array::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            TensorError::IncompatibleShape {
                from: vec![expected],
                to: shape.to_vec(),
            }
        })?;
        Ok(Tensor { data })
    }

    /// 创建一个所有元素均为0的张量
    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    /// 创建一个所有元素均为1的张量
    pub fn ones(shape: &[usize]) -> Tensor {
        Self::full(1.0, shape)
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(value: f32, shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个形状与`other`一致、元素全为0的张量
    pub fn zeros_like(other: &Tensor) -> Tensor {
        Self::zeros(other.shape())
    }

    /// 使用给定的随机数发生器创建一个服从正态分布N(mean, std_dev²)的随机张量。
    /// 采用Box-Muller变换，每次生成一对样本。
    pub fn new_normal_with_rng<R: Rng + ?Sized>(
        mean: f32,
        std_dev: f32,
        shape: &[usize],
        rng: &mut R,
    ) -> Tensor {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f32 = rng.r#gen();
            let u2: f32 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Tensor::new(&data, shape)
    }

    /// 创建一个服从正态分布的随机张量（使用线程本地随机数发生器，结果不可复现）
    pub fn new_normal(mean: f32, std_dev: f32, shape: &[usize]) -> Tensor {
        Self::new_normal_with_rng(mean, std_dev, shape, &mut rand::thread_rng())
    }

    pub(crate) fn from_array(data: ArrayD<f32>) -> Tensor {
        // 非标准布局（如转置视图的拷贝）统一整理为连续内存
        if data.is_standard_layout() {
            Tensor { data }
        } else {
            Tensor {
                data: data.as_standard_layout().into_owned(),
            }
        }
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }
}
