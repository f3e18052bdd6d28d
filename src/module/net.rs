/*
 * @Description  : NetModule：基于本 crate 引擎的可训练模块实现
 *
 * 生命周期：new → bind → init_params → init_optimizer → (forward → backward → update)*
 */

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GradientSet, TrainableModule};
use crate::data::DataBatch;
use crate::metric::EvalMetric;
use crate::nn::{
    Adam, AdamConfig, Initializer, Layer, LogisticRegressionOutput, NnError, Optimizer, Param,
};
use crate::tensor::Tensor;

/// 参数文件内容：可训练参数与辅助状态分开存放
#[derive(Serialize, Deserialize)]
struct ParamFile {
    params: Vec<(String, Tensor)>,
    aux_states: Vec<(String, Tensor)>,
}

/// 绑定后固定下来的形状信息
struct Binding {
    data_shape: Vec<usize>,
    label_shape: Option<Vec<usize>>,
    output_shape: Vec<usize>,
    inputs_need_grad: bool,
}

pub struct NetModule {
    name: String,
    network: Box<dyn Layer>,
    head: Option<LogisticRegressionOutput>,
    binding: Option<Binding>,
    optimizer: Option<Adam>,
    /// 最近一次前向的标签、输出，以及该前向是否为训练模式
    label: Option<Tensor>,
    outputs: Option<Tensor>,
    trained_forward: bool,
    input_grads: Option<Tensor>,
}

fn invalid_state(module: &str, message: impl Into<String>) -> NnError {
    NnError::InvalidState {
        module: module.to_string(),
        message: message.into(),
    }
}

impl NetModule {
    /// `head` 为 `None` 时，反向传播需要外部给出对输出的梯度
    pub fn new(
        name: &str,
        network: impl Layer + 'static,
        head: Option<LogisticRegressionOutput>,
    ) -> Self {
        Self {
            name: name.to_string(),
            network: Box::new(network),
            head,
            binding: None,
            optimizer: None,
            label: None,
            outputs: None,
            trained_forward: false,
            input_grads: None,
        }
    }

    /// 绑定输入（及标签）形状，并检查网络能否接受该形状
    pub fn bind(
        &mut self,
        data_shape: &[usize],
        label_shape: Option<&[usize]>,
        inputs_need_grad: bool,
    ) -> Result<(), NnError> {
        let output_shape = self.network.output_shape(data_shape)?;
        match (&self.head, label_shape) {
            (Some(_), Some(label)) => {
                if label.iter().product::<usize>() != output_shape.iter().product::<usize>() {
                    return Err(NnError::ShapeMismatch {
                        layer: self.name.clone(),
                        expected: output_shape,
                        got: label.to_vec(),
                    });
                }
            }
            (Some(_), None) => {
                return Err(invalid_state(&self.name, "带输出头的模块绑定时必须给出标签形状"));
            }
            (None, Some(_)) => {
                return Err(invalid_state(&self.name, "没有输出头的模块不接受标签"));
            }
            (None, None) => {}
        }
        debug!(
            "{} 绑定: 输入 {:?} → 输出 {:?}",
            self.name, data_shape, output_shape
        );
        self.binding = Some(Binding {
            data_shape: data_shape.to_vec(),
            label_shape: label_shape.map(<[usize]>::to_vec),
            output_shape,
            inputs_need_grad,
        });
        Ok(())
    }

    fn binding(&self) -> Result<&Binding, NnError> {
        self.binding
            .as_ref()
            .ok_or_else(|| invalid_state(&self.name, "模块尚未绑定"))
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// 初始化全部参数与辅助状态
    pub fn init_params<I: Initializer, R: Rng + ?Sized>(
        &mut self,
        initializer: &I,
        rng: &mut R,
    ) -> Result<(), NnError> {
        self.binding()?;
        for param in self.network.params_mut() {
            initializer.init_param(param, &mut *rng);
        }
        for state in self.network.aux_states_mut() {
            initializer.init_param(state, &mut *rng);
        }
        Ok(())
    }

    /// 挂上 Adam 优化器。`rescale_grad` 总是被设为 1 / batch_size
    pub fn init_optimizer(&mut self, mut config: AdamConfig) -> Result<(), NnError> {
        let batch_size = self.binding()?.data_shape[0];
        config.rescale_grad = 1.0 / batch_size as f32;
        self.optimizer = Some(Adam::new(config));
        Ok(())
    }

    pub fn optimizer(&self) -> Option<&Adam> {
        self.optimizer.as_ref()
    }

    pub fn params(&self) -> Vec<&Param> {
        self.network.params()
    }

    pub fn aux_states(&self) -> Vec<&Param> {
        self.network.aux_states()
    }

    pub fn output_shape(&self) -> Result<&[usize], NnError> {
        Ok(&self.binding()?.output_shape)
    }

    /// 从 [`TrainableModule::save_params`] 写出的文件中按名称恢复参数与辅助状态
    pub fn load_params(&mut self, path: &Path) -> Result<(), NnError> {
        let reader = BufReader::new(File::open(path)?);
        let file: ParamFile = bincode::deserialize_from(reader)
            .map_err(|e| NnError::Serialization(e.to_string()))?;
        restore(&self.name, self.network.params_mut(), &file.params)?;
        restore(&self.name, self.network.aux_states_mut(), &file.aux_states)?;
        Ok(())
    }
}

/// 按名称把保存的值写回参数
fn restore(
    module: &str,
    params: Vec<&mut Param>,
    saved: &[(String, Tensor)],
) -> Result<(), NnError> {
    for param in params {
        let value = saved
            .iter()
            .find(|(name, _)| name == param.name())
            .map(|(_, value)| value)
            .ok_or_else(|| invalid_state(module, format!("参数文件中缺少 {}", param.name())))?;
        if !value.is_same_shape(param.value()) {
            return Err(NnError::ShapeMismatch {
                layer: param.name().to_string(),
                expected: param.shape().to_vec(),
                got: value.shape().to_vec(),
            });
        }
        *param.value_mut() = value.clone();
    }
    Ok(())
}

impl TrainableModule for NetModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, batch: &DataBatch, is_train: bool) -> Result<(), NnError> {
        let binding = self.binding()?;
        if batch.data.shape() != binding.data_shape.as_slice() {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: binding.data_shape.clone(),
                got: batch.data.shape().to_vec(),
            });
        }
        if let (Some(expected), Some(label)) = (&binding.label_shape, &batch.label) {
            if label.shape() != expected.as_slice() {
                return Err(NnError::ShapeMismatch {
                    layer: self.name.clone(),
                    expected: expected.clone(),
                    got: label.shape().to_vec(),
                });
            }
        }

        let mut output = self.network.forward(&batch.data, is_train)?;
        if let Some(head) = &mut self.head {
            output = head.forward(&output);
        }
        self.outputs = Some(output);
        self.label = batch.label.clone();
        self.trained_forward = is_train;
        self.input_grads = None;
        Ok(())
    }

    fn backward(&mut self, out_grads: Option<&Tensor>) -> Result<(), NnError> {
        if !self.trained_forward {
            return Err(invalid_state(&self.name, "反向传播前必须先以训练模式前向"));
        }
        let grad = match (&self.head, out_grads) {
            (Some(head), None) => {
                let label = self
                    .label
                    .as_ref()
                    .ok_or_else(|| invalid_state(&self.name, "反向传播需要批标签"))?;
                head.backward(label)?
            }
            (None, Some(grad)) => grad.clone(),
            (Some(_), Some(_)) => {
                return Err(invalid_state(&self.name, "带输出头的模块由标签产生梯度，不接受外部梯度"));
            }
            (None, None) => {
                return Err(invalid_state(&self.name, "没有输出头的模块反向传播需要外部梯度"));
            }
        };
        let input_grad = self.network.backward(&grad)?;
        let inputs_need_grad = self.binding()?.inputs_need_grad;
        self.input_grads = inputs_need_grad.then_some(input_grad);
        Ok(())
    }

    fn update(&mut self) -> Result<(), NnError> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| invalid_state(&self.name, "尚未初始化优化器"))?;
        let mut params = self.network.params_mut();
        optimizer.step(&mut params)
    }

    fn get_outputs(&self) -> Result<&Tensor, NnError> {
        self.outputs
            .as_ref()
            .ok_or_else(|| invalid_state(&self.name, "尚未前向传播"))
    }

    fn get_input_grads(&self) -> Result<&Tensor, NnError> {
        if !self.binding()?.inputs_need_grad {
            return Err(invalid_state(&self.name, "绑定时未要求输入梯度"));
        }
        self.input_grads
            .as_ref()
            .ok_or_else(|| invalid_state(&self.name, "尚未反向传播"))
    }

    fn update_metric(&self, metric: &mut dyn EvalMetric, labels: &Tensor) -> Result<(), NnError> {
        metric.update(labels, self.get_outputs()?)?;
        Ok(())
    }

    fn gradients(&self) -> GradientSet {
        self.network
            .params()
            .into_iter()
            .map(|p| (p.name().to_string(), p.grad().clone()))
            .collect()
    }

    fn set_gradients(&mut self, gradients: GradientSet) -> Result<(), NnError> {
        let mut params = self.network.params_mut();
        if params.len() != gradients.len() {
            return Err(NnError::GradientMismatch {
                module: self.name.clone(),
                message: format!("模块有 {} 个参数，梯度集合有 {} 个", params.len(), gradients.len()),
            });
        }
        for (param, (name, grad)) in params.iter_mut().zip(gradients.into_entries()) {
            if param.name() != name || !grad.is_same_shape(param.value()) {
                return Err(NnError::GradientMismatch {
                    module: self.name.clone(),
                    message: format!(
                        "参数 {} {:?} 与梯度 {} {:?} 不对应",
                        param.name(),
                        param.shape(),
                        name,
                        grad.shape()
                    ),
                });
            }
            *param.grad_mut() = grad;
        }
        Ok(())
    }

    fn save_params(&self, path: &Path) -> Result<(), NnError> {
        let collect = |params: Vec<&Param>| -> Vec<(String, Tensor)> {
            params
                .into_iter()
                .map(|p| (p.name().to_string(), p.value().clone()))
                .collect()
        };
        let file = ParamFile {
            params: collect(self.network.params()),
            aux_states: collect(self.network.aux_states()),
        };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &file).map_err(|e| NnError::Serialization(e.to_string()))
    }
}
