/*
 * @Description  : nn 模块的单元测试。层的反向传播统一用中心差分做数值校验。
 */

mod loss;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::nn::{Initializer, Layer, NnError, Normal};
use crate::tensor::Tensor;

/// 以 N(0, σ²) 初始化层的全部参数（gamma 置1）
pub(super) fn init_layer(layer: &mut dyn Layer, sigma: f32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let init = Normal::new(sigma);
    for param in layer.params_mut() {
        init.init_param(param, &mut rng);
    }
    for state in layer.aux_states_mut() {
        init.init_param(state, &mut rng);
    }
}

/// 标量目标 L = Σ(output ⊙ weights)，于是 ∂L/∂output = weights
fn objective(layer: &mut dyn Layer, input: &Tensor, weights: &Tensor) -> Result<f32, NnError> {
    let output = layer.forward(input, true)?;
    Ok((&output * weights).sum())
}

/// 对输入做中心差分，得到数值梯度
pub(super) fn numeric_input_grad(
    layer: &mut dyn Layer,
    input: &Tensor,
    weights: &Tensor,
    eps: f32,
) -> Result<Tensor, NnError> {
    let mut grad = Tensor::zeros_like(input);
    for i in 0..input.size() {
        let mut plus = input.clone();
        plus.as_slice_mut()[i] += eps;
        let mut minus = input.clone();
        minus.as_slice_mut()[i] -= eps;
        let diff = objective(layer, &plus, weights)? - objective(layer, &minus, weights)?;
        grad.as_slice_mut()[i] = diff / (2.0 * eps);
    }
    Ok(grad)
}

/// 对第 `index` 个参数做中心差分，得到数值梯度
pub(super) fn numeric_param_grad(
    layer: &mut dyn Layer,
    index: usize,
    input: &Tensor,
    weights: &Tensor,
    eps: f32,
) -> Result<Tensor, NnError> {
    let size = layer.params()[index].value().size();
    let shape = layer.params()[index].shape().to_vec();
    let mut grad = Tensor::zeros(&shape);
    for i in 0..size {
        layer.params_mut()[index].value_mut().as_slice_mut()[i] += eps;
        let plus = objective(layer, input, weights)?;
        layer.params_mut()[index].value_mut().as_slice_mut()[i] -= 2.0 * eps;
        let minus = objective(layer, input, weights)?;
        layer.params_mut()[index].value_mut().as_slice_mut()[i] += eps;
        grad.as_slice_mut()[i] = (plus - minus) / (2.0 * eps);
    }
    Ok(grad)
}

/// 解析梯度（前向 + 反向）与数值梯度逐元素比较，容差为 `tol`
pub(super) fn check_gradients(
    layer: &mut dyn Layer,
    input: &Tensor,
    seed: u64,
    eps: f32,
    tol: f32,
) -> Result<(), NnError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let output_shape = layer.output_shape(input.shape())?;
    let weights = Tensor::new_normal_with_rng(0.0, 1.0, &output_shape, &mut rng);

    layer.forward(input, true)?;
    let analytic_dx = layer.backward(&weights)?;
    let analytic_params: Vec<Tensor> = layer.params().iter().map(|p| p.grad().clone()).collect();

    let numeric_dx = numeric_input_grad(layer, input, &weights, eps)?;
    assert_close(&analytic_dx, &numeric_dx, tol, "input");

    for (index, analytic) in analytic_params.iter().enumerate() {
        let numeric = numeric_param_grad(layer, index, input, &weights, eps)?;
        let name = layer.params()[index].name().to_string();
        assert_close(analytic, &numeric, tol, &name);
    }
    Ok(())
}

pub(super) fn assert_close(actual: &Tensor, expected: &Tensor, tol: f32, what: &str) {
    assert_eq!(actual.shape(), expected.shape(), "{what}: 形状不同");
    for (i, (a, e)) in actual.as_slice().iter().zip(expected.as_slice()).enumerate() {
        assert!(
            (a - e).abs() <= tol * (1.0 + e.abs()),
            "{what}[{i}]: 解析梯度 {a}，数值梯度 {e}"
        );
    }
}
