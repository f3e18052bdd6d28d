/*
 * @Description  : 可训练模块：把网络、输出头、优化器和形状绑定打包成一个
 *                 “前向 → 反向 → 更新”的有状态对象，训练循环只通过 [`TrainableModule`] 与之交互。
 */

mod gradient;
mod net;

#[cfg(test)]
mod tests;

use std::path::Path;

pub use gradient::GradientSet;
pub use net::NetModule;

use crate::data::DataBatch;
use crate::metric::EvalMetric;
use crate::nn::NnError;
use crate::tensor::Tensor;

/// 可训练模块 trait
///
/// # 调用约定
/// - `backward()` 前必须有一次 `forward(batch, true)`
/// - 每次 `backward()` 都是“写入”参数梯度，不与上一次累加；
///   需要累加时用 [`TrainableModule::gradients`] 取出快照，
///   [`GradientSet::accumulate`] 后再 [`TrainableModule::set_gradients`] 写回
/// - `update()` 用当前梯度更新一次参数
pub trait TrainableModule {
    fn name(&self) -> &str;

    fn forward(&mut self, batch: &DataBatch, is_train: bool) -> Result<(), NnError>;

    /// 带输出头的模块传 `None`（梯度由标签产生）；否则须给出对输出的梯度
    fn backward(&mut self, out_grads: Option<&Tensor>) -> Result<(), NnError>;

    fn update(&mut self) -> Result<(), NnError>;

    /// 最近一次前向的输出
    fn get_outputs(&self) -> Result<&Tensor, NnError>;

    /// 最近一次反向得到的对输入的梯度（绑定时需 `inputs_need_grad`）
    fn get_input_grads(&self) -> Result<&Tensor, NnError>;

    /// 用最近一次前向的输出与 `labels` 更新指标
    fn update_metric(&self, metric: &mut dyn EvalMetric, labels: &Tensor) -> Result<(), NnError>;

    /// 当前参数梯度的深拷贝
    fn gradients(&self) -> GradientSet;

    fn set_gradients(&mut self, gradients: GradientSet) -> Result<(), NnError>;

    fn save_params(&self, path: &Path) -> Result<(), NnError>;
}
