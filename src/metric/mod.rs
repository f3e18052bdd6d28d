/*
 * @Description  : 评估指标累加器。每个指标维护 (sum_metric, num_inst)，
 *                 每个 epoch 开始时重置，按批累加。
 */

use thiserror::Error;

use crate::tensor::Tensor;

#[cfg(test)]
mod tests;

/// 预测概率取对数前加上的平滑项，避免 ln(0)
const LOG_EPS: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("指标 {metric}: 标签有 {labels} 个元素，预测有 {preds} 个元素")]
    SizeMismatch {
        metric: String,
        labels: usize,
        preds: usize,
    },
}

/// 评估指标 trait
pub trait EvalMetric {
    fn name(&self) -> &str;

    fn reset(&mut self);

    /// 用一批标签与预测（二者元素个数必须相同）累加指标
    fn update(&mut self, labels: &Tensor, preds: &Tensor) -> Result<(), MetricError>;

    /// 返回 (名称, 均值)；尚未累加任何样本时均值为0
    fn get(&self) -> (&str, f64) {
        let value = match self.num_inst() {
            0 => 0.0,
            n => self.sum_metric() / n as f64,
        };
        (self.name(), value)
    }

    fn num_inst(&self) -> usize;

    fn sum_metric(&self) -> f64;
}

/// 累加状态，各指标共用
#[derive(Debug, Default, Clone, PartialEq)]
struct Accumulator {
    sum_metric: f64,
    num_inst: usize,
}

impl Accumulator {
    fn add<F: Fn(f64, f64) -> f64>(
        &mut self,
        metric: &str,
        labels: &Tensor,
        preds: &Tensor,
        per_sample: F,
    ) -> Result<(), MetricError> {
        if labels.size() != preds.size() {
            return Err(MetricError::SizeMismatch {
                metric: metric.to_string(),
                labels: labels.size(),
                preds: preds.size(),
            });
        }
        for (&y, &p) in labels.as_slice().iter().zip(preds.as_slice()) {
            self.sum_metric += per_sample(f64::from(y), f64::from(p));
        }
        self.num_inst += labels.size();
        Ok(())
    }
}

/// 二元交叉熵：-(y·ln(p + ε) + (1 - y)·ln(1 - p + ε))
#[derive(Debug, Default, Clone)]
pub struct CrossEntropyMetric {
    state: Accumulator,
}

impl CrossEntropyMetric {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvalMetric for CrossEntropyMetric {
    fn name(&self) -> &str {
        "ce"
    }

    fn reset(&mut self) {
        self.state = Accumulator::default();
    }

    fn update(&mut self, labels: &Tensor, preds: &Tensor) -> Result<(), MetricError> {
        self.state.add("ce", labels, preds, |y, p| {
            -(y * (p + LOG_EPS).ln() + (1.0 - y) * (1.0 - p + LOG_EPS).ln())
        })
    }

    fn num_inst(&self) -> usize {
        self.state.num_inst
    }

    fn sum_metric(&self) -> f64 {
        self.state.sum_metric
    }
}

/// 二分类准确率：预测概率大于0.5视为1
#[derive(Debug, Default, Clone)]
pub struct AccMetric {
    state: Accumulator,
}

impl AccMetric {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvalMetric for AccMetric {
    fn name(&self) -> &str {
        "acc"
    }

    fn reset(&mut self) {
        self.state = Accumulator::default();
    }

    fn update(&mut self, labels: &Tensor, preds: &Tensor) -> Result<(), MetricError> {
        self.state.add("acc", labels, preds, |y, p| {
            let predicted = if p > 0.5 { 1.0 } else { 0.0 };
            if predicted == y { 1.0 } else { 0.0 }
        })
    }

    fn num_inst(&self) -> usize {
        self.state.num_inst
    }

    fn sum_metric(&self) -> f64 {
        self.state.sum_metric
    }
}
