use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use approx::assert_abs_diff_eq;

use super::{TrainError, TrainSummary, run, train};
use crate::checkpoint::{CheckpointError, CheckpointSink};
use crate::config::{Config, ConfigError};
use crate::data::{DataBatch, LastBatchHandle, NdArrayIter, RandIter};
use crate::metric::EvalMetric;
use crate::module::{GradientSet, TrainableModule};
use crate::nn::NnError;
use crate::tensor::Tensor;

const BATCH: usize = 4;
const Z_DIM: usize = 3;
/// 判别器桩模块对任何输入都给出的概率
const D_PROB: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Forward {
        module: &'static str,
        data: Tensor,
        label: Option<Tensor>,
    },
    Backward {
        module: &'static str,
        out_grads: Option<Tensor>,
    },
    SetGradients {
        module: &'static str,
    },
    Update {
        module: &'static str,
        grad: Tensor,
    },
}

impl Event {
    fn tag(&self) -> String {
        match self {
            Event::Forward { module, .. } => format!("{module}.forward"),
            Event::Backward { module, .. } => format!("{module}.backward"),
            Event::SetGradients { module } => format!("{module}.set_gradients"),
            Event::Update { module, .. } => format!("{module}.update"),
        }
    }
}

type Log = Rc<RefCell<Vec<Event>>>;

/// 记录调用顺序的桩模块
///
/// - 生成器（"G"）第 k 次前向输出全为 0.1·k 的 [B, 1, 2, 2]
/// - 判别器（"D"）输出恒为 [`D_PROB`]；第 n 次反向把唯一的“参数梯度”写成全 n
struct StubModule {
    name: &'static str,
    log: Log,
    forwards: usize,
    backwards: usize,
    output: Option<Tensor>,
    input_grads: Option<Tensor>,
    grad: Tensor,
}

impl StubModule {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            forwards: 0,
            backwards: 0,
            output: None,
            input_grads: None,
            grad: Tensor::zeros(&[2]),
        }
    }

    fn record(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }
}

impl TrainableModule for StubModule {
    fn name(&self) -> &str {
        self.name
    }

    fn forward(&mut self, batch: &DataBatch, _is_train: bool) -> Result<(), NnError> {
        self.forwards += 1;
        self.record(Event::Forward {
            module: self.name,
            data: batch.data.clone(),
            label: batch.label.clone(),
        });
        let output = if self.name == "G" {
            Tensor::full(0.1 * self.forwards as f32, &[BATCH, 1, 2, 2])
        } else {
            self.input_grads = Some(Tensor::full(0.5, batch.data.shape()));
            Tensor::full(D_PROB, &[BATCH, 1])
        };
        self.output = Some(output);
        Ok(())
    }

    fn backward(&mut self, out_grads: Option<&Tensor>) -> Result<(), NnError> {
        self.backwards += 1;
        self.grad = Tensor::full(self.backwards as f32, &[2]);
        self.record(Event::Backward {
            module: self.name,
            out_grads: out_grads.cloned(),
        });
        Ok(())
    }

    fn update(&mut self) -> Result<(), NnError> {
        self.record(Event::Update {
            module: self.name,
            grad: self.grad.clone(),
        });
        Ok(())
    }

    fn get_outputs(&self) -> Result<&Tensor, NnError> {
        self.output
            .as_ref()
            .ok_or_else(|| NnError::NoForwardCache(self.name.to_string()))
    }

    fn get_input_grads(&self) -> Result<&Tensor, NnError> {
        self.input_grads
            .as_ref()
            .ok_or_else(|| NnError::NoForwardCache(self.name.to_string()))
    }

    fn update_metric(&self, metric: &mut dyn EvalMetric, labels: &Tensor) -> Result<(), NnError> {
        metric.update(labels, self.get_outputs()?)?;
        Ok(())
    }

    fn gradients(&self) -> GradientSet {
        std::iter::once(("w".to_string(), self.grad.clone())).collect()
    }

    fn set_gradients(&mut self, gradients: GradientSet) -> Result<(), NnError> {
        self.record(Event::SetGradients { module: self.name });
        if let Some((_, grad)) = gradients.into_entries().into_iter().next() {
            self.grad = grad;
        }
        Ok(())
    }

    fn save_params(&self, _path: &Path) -> Result<(), NnError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    saved: Vec<(usize, Tensor, Tensor)>,
}

impl CheckpointSink for RecordingSink {
    fn save_epoch(
        &mut self,
        epoch: usize,
        _generator: &dyn TrainableModule,
        _discriminator: &dyn TrainableModule,
        fake: &Tensor,
        real: &Tensor,
    ) -> Result<(), CheckpointError> {
        self.saved.push((epoch, fake.clone(), real.clone()));
        Ok(())
    }
}

fn stub_config(end_epoch: usize) -> Config {
    let mut config = Config::default();
    config.default.frequent = 1;
    config.train.batch_size = BATCH;
    config.train.end_epoch = end_epoch;
    config
}

/// 每个样本的像素值都等于样本序号
fn real_data(num_samples: usize) -> Tensor {
    let values: Vec<f32> = (0..num_samples)
        .flat_map(|i| std::iter::repeat_n(i as f32, 4))
        .collect();
    Tensor::new(&values, &[num_samples, 1, 2, 2])
}

struct Outcome {
    summary: TrainSummary,
    events: Vec<Event>,
    sink: RecordingSink,
}

fn train_stubs(end_epoch: usize) -> Result<Outcome, TrainError> {
    let log: Log = Rc::default();
    let mut generator = StubModule::new("G", &log);
    let mut discriminator = StubModule::new("D", &log);
    let mut train_iter = NdArrayIter::new(real_data(8), BATCH, LastBatchHandle::Pad)?;
    let mut rand_iter = RandIter::new(BATCH, Z_DIM, 7);
    let mut sink = RecordingSink::default();

    let summary = train(
        &stub_config(end_epoch),
        &mut generator,
        &mut discriminator,
        &mut train_iter,
        &mut rand_iter,
        &mut sink,
    )?;
    let events = log.borrow().clone();
    Ok(Outcome {
        summary,
        events,
        sink,
    })
}

fn d_forwards(events: &[Event]) -> Vec<(&Tensor, Option<&Tensor>)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Forward {
                module: "D",
                data,
                label,
            } => Some((data, label.as_ref())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_each_batch_follows_protocol() -> Result<(), TrainError> {
    let outcome = train_stubs(1)?;
    let per_batch = [
        "G.forward",
        "D.forward",
        "D.backward",
        "D.forward",
        "D.backward",
        "D.set_gradients",
        "D.update",
        "D.forward",
        "D.backward",
        "G.backward",
        "G.update",
    ];
    let expected: Vec<String> = per_batch
        .iter()
        .chain(per_batch.iter())
        .map(|s| s.to_string())
        .collect();
    let tags: Vec<String> = outcome.events.iter().map(Event::tag).collect();
    assert_eq!(tags, expected);
    Ok(())
}

#[test]
fn test_labels_are_zero_for_fake_and_one_for_real() -> Result<(), TrainError> {
    let outcome = train_stubs(1)?;
    let forwards = d_forwards(&outcome.events);
    assert_eq!(forwards.len(), 6);
    for (i, (_, label)) in forwards.iter().enumerate() {
        let label = label.expect("判别器的每次前向都带标签");
        assert_eq!(label.shape(), &[BATCH]);
        let expected = if i % 3 == 0 { 0.0 } else { 1.0 };
        assert!(label.all_eq(expected), "第 {i} 次判别器前向的标签应全为 {expected}");
    }
    // 生成器的输入只有噪声
    for event in &outcome.events {
        if let Event::Forward {
            module: "G",
            data,
            label,
        } = event
        {
            assert_eq!(data.shape(), &[BATCH, Z_DIM]);
            assert!(label.is_none());
        }
    }
    Ok(())
}

#[test]
fn test_discriminator_update_sees_fake_plus_real_gradients() -> Result<(), TrainError> {
    let outcome = train_stubs(1)?;
    let updates: Vec<&Tensor> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Update { module: "D", grad } => Some(grad),
            _ => None,
        })
        .collect();
    // 批1：假样本反向写 1，真样本反向写 2；批2：4 与 5
    assert_eq!(updates.len(), 2);
    assert!(updates[0].all_eq(3.0));
    assert!(updates[1].all_eq(9.0));
    Ok(())
}

#[test]
fn test_generated_batch_is_reused_within_a_batch() -> Result<(), TrainError> {
    let outcome = train_stubs(1)?;
    let forwards = d_forwards(&outcome.events);
    for (batch, chunk) in forwards.chunks(3).enumerate() {
        let out_g = Tensor::full(0.1 * (batch + 1) as f32, &[BATCH, 1, 2, 2]);
        assert_eq!(chunk[0].0, &out_g);
        assert_eq!(chunk[2].0, &out_g);
        let indices: Vec<usize> = (batch * BATCH..(batch + 1) * BATCH).collect();
        assert_eq!(chunk[1].0, &real_data(8).select_samples(&indices));
    }
    Ok(())
}

#[test]
fn test_generator_backward_receives_discriminator_input_grads() -> Result<(), TrainError> {
    let outcome = train_stubs(1)?;
    let received: Vec<Option<&Tensor>> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Backward { module: "G", out_grads } => Some(out_grads.as_ref()),
            _ => None,
        })
        .collect();
    assert_eq!(received.len(), 2);
    for grads in received {
        assert_eq!(grads, Some(&Tensor::full(0.5, &[BATCH, 1, 2, 2])));
    }
    Ok(())
}

#[test]
fn test_metric_counts_after_one_epoch() -> Result<(), TrainError> {
    let summary = train_stubs(1)?.summary;
    assert_eq!(summary.epochs, 1);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.d_acc.num_inst, 2 * 2 * BATCH);
    assert_eq!(summary.d_ce.num_inst, 2 * 2 * BATCH);
    assert_eq!(summary.g_ce.num_inst, 2 * BATCH);

    // 判别器恒输出 0.7：假样本全判错、真样本全判对
    assert_abs_diff_eq!(summary.d_acc.value, 0.5, epsilon = 1e-9);
    let p = D_PROB as f64;
    assert_abs_diff_eq!(summary.g_ce.value, -(p + 1e-12).ln(), epsilon = 1e-5);
    let d_ce = (-(1.0 - p + 1e-12).ln() - (p + 1e-12).ln()) / 2.0;
    assert_abs_diff_eq!(summary.d_ce.value, d_ce, epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_one_checkpoint_per_epoch_with_last_batch() -> Result<(), TrainError> {
    let outcome = train_stubs(1)?;
    assert_eq!(outcome.sink.saved.len(), 1);
    let (epoch, fake, real) = &outcome.sink.saved[0];
    assert_eq!(*epoch, 1);
    assert_eq!(fake, &Tensor::full(0.2, &[BATCH, 1, 2, 2]));
    assert_eq!(real, &real_data(8).select_samples(&[4, 5, 6, 7]));

    let outcome = train_stubs(2)?;
    let epochs: Vec<usize> = outcome.sink.saved.iter().map(|(e, _, _)| *e).collect();
    assert_eq!(epochs, vec![1, 2]);
    assert_eq!(outcome.summary.batches, 4);
    // 指标在每个 epoch 开始时重置
    assert_eq!(outcome.summary.g_ce.num_inst, 2 * BATCH);
    Ok(())
}

#[test]
fn test_zero_log_frequency_still_trains() -> Result<(), TrainError> {
    let log: Log = Rc::default();
    let mut generator = StubModule::new("G", &log);
    let mut discriminator = StubModule::new("D", &log);
    let mut train_iter = NdArrayIter::new(real_data(8), BATCH, LastBatchHandle::Pad)?;
    let mut rand_iter = RandIter::new(BATCH, Z_DIM, 7);
    let mut sink = RecordingSink::default();
    let mut config = stub_config(1);
    config.default.frequent = 0;

    let summary = train(
        &config,
        &mut generator,
        &mut discriminator,
        &mut train_iter,
        &mut rand_iter,
        &mut sink,
    )?;
    assert_eq!(summary.batches, 2);
    assert_eq!(sink.saved.len(), 1);
    Ok(())
}

#[test]
fn test_epoch_without_batches_fails() -> Result<(), TrainError> {
    let log: Log = Rc::default();
    let mut generator = StubModule::new("G", &log);
    let mut discriminator = StubModule::new("D", &log);
    let mut train_iter = NdArrayIter::new(real_data(3), BATCH, LastBatchHandle::Discard)?;
    let mut rand_iter = RandIter::new(BATCH, Z_DIM, 7);
    let mut sink = RecordingSink::default();

    let result = train(
        &stub_config(1),
        &mut generator,
        &mut discriminator,
        &mut train_iter,
        &mut rand_iter,
        &mut sink,
    );
    assert!(matches!(result, Err(TrainError::EmptyEpoch { epoch: 0 })));
    assert!(sink.saved.is_empty());
    assert!(log.borrow().is_empty());
    Ok(())
}

#[test]
fn test_run_rejects_bad_config_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out");

    let mut config = stub_config(1);
    config.output_path = output.clone();
    config.dataset.dataset = "cifar99".to_string();
    let err = run(&config, Path::new("cifar99.yaml")).unwrap_err();
    assert!(matches!(
        err,
        TrainError::Config(ConfigError::UnsupportedDataset(ref name)) if name == "cifar99"
    ));
    assert!(!output.exists());

    let mut config = stub_config(1);
    config.output_path = output.clone();
    config.gpus = "0,1".to_string();
    let err = run(&config, Path::new("mnist.yaml")).unwrap_err();
    assert!(matches!(
        err,
        TrainError::Config(ConfigError::DeviceCount { count: 2, .. })
    ));
    assert!(!output.exists());
}
