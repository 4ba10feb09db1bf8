use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    grad_clipping::GradientClippingConfig,
    lr_scheduler::LrScheduler,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, LearningRate, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
};
use serde::{Deserialize, Serialize};

use crate::utils::tensors;

use super::{
    batcher::{Batch, Batcher},
    dataset::FeatureSet,
    labels::LabelSchema,
    metrics,
    model::{Model, Output},
    schedule::WarmupLinear,
    sink::Sink,
};

/// Define configuration struct for the experiment
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// The task to train on (e.g., "conll")
    pub task: String,

    /// Model name whose tokenizer is used (e.g., "bert-base-cased")
    pub model_name: String,

    /// The location of the task's data directory
    #[config(default = "\"data\".to_string()")]
    pub data_dir: String,

    /// Maximum sequence length, special tokens included
    #[config(default = 128)]
    pub max_seq_length: usize,

    /// Batch size
    #[config(default = 32)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 25)]
    pub num_epochs: usize,

    /// Peak learning rate
    #[config(default = 3e-5)]
    pub learning_rate: LearningRate,

    /// The fraction of all steps spent warming up
    #[config(default = 0.1)]
    pub warmup_proportion: f64,

    /// Gradients are clipped to this norm
    #[config(default = 2.0)]
    pub max_grad_norm: f32,

    /// AdamW epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// AdamW weight decay
    #[config(default = 0.02)]
    pub weight_decay: f32,

    /// Lower-case text before tokenizing it
    #[config(default = true)]
    pub lowercase: bool,

    /// Column delimiter for tagging files
    #[config(default = "','")]
    pub delimiter: char,

    /// Seed for shuffling and parameter initialization
    #[config(default = 42)]
    pub seed: u64,

    /// Data loader worker threads
    #[config(default = 1)]
    pub num_workers: usize,
}

/// Metrics for one epoch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// The zero-based epoch index
    pub epoch: usize,

    /// Mean training loss over the epoch's steps
    pub train_loss: f64,

    /// Mean training accuracy over the epoch's steps
    pub train_accuracy: f64,

    /// Mean training F1 over the epoch's steps
    pub train_f1: f64,

    /// Mean validation loss over batches
    pub valid_loss: f64,

    /// Mean validation accuracy over batches
    pub valid_accuracy: f64,

    /// Validation F1 over every position of the split
    pub valid_f1: f64,
}

/// Drives epochs of optimizer steps, each followed by validation, reporting to a sink
pub struct Trainer<'a, B: AutodiffBackend> {
    dataloader_train: Arc<dyn DataLoader<B, Batch<B>>>,
    dataloader_valid: Arc<dyn DataLoader<B::InnerBackend, Batch<B::InnerBackend>>>,
    schema: &'a LabelSchema,
    batch_size: usize,
    device: B::Device,
    sink: &'a mut dyn Sink,
    optimizer: AdamWConfig,
}

impl<'a, B: AutodiffBackend> Trainer<'a, B> {
    /// Creates a new trainer. `batch_size` sizes the learning rate schedule and should match the
    /// training data loader; step keys count the batches actually drawn.
    pub fn new(
        dataloader_train: Arc<dyn DataLoader<B, Batch<B>>>,
        dataloader_valid: Arc<dyn DataLoader<B::InnerBackend, Batch<B::InnerBackend>>>,
        schema: &'a LabelSchema,
        batch_size: usize,
        device: B::Device,
        sink: &'a mut dyn Sink,
    ) -> Self {
        Self {
            dataloader_train,
            dataloader_valid,
            schema,
            batch_size,
            device,
            sink,
            optimizer: AdamWConfig::new()
                .with_epsilon(1e-8)
                .with_weight_decay(0.02),
        }
    }

    /// Use different AdamW settings. Gradient clipping is always set by `fit`.
    pub fn with_optimizer(mut self, optimizer: AdamWConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Train for `num_epochs`, validating after each one
    pub fn fit<M>(
        &mut self,
        model: M,
        num_epochs: usize,
        max_grad_norm: f32,
        learning_rate: LearningRate,
        warmup_proportion: f64,
    ) -> Result<(M, Vec<EpochSummary>), TrainError>
    where
        M: AutodiffModule<B> + Model<B>,
        M::InnerModule: Model<B::InnerBackend>,
    {
        if model.num_labels() != self.schema.len() {
            return Err(TrainError::LabelCount {
                model: model.num_labels(),
                schema: self.schema.len(),
            });
        }

        let batches_per_epoch = if self.batch_size == 0 {
            0
        } else {
            self.dataloader_train.num_items().div_ceil(self.batch_size)
        };

        if batches_per_epoch == 0 {
            return Err(TrainError::EmptyDataset("train"));
        }

        let total_steps = num_epochs * batches_per_epoch;
        let mut scheduler = WarmupLinear::new(learning_rate, warmup_proportion, total_steps);

        let mut optimizer = self
            .optimizer
            .clone()
            .with_grad_clipping(Some(GradientClippingConfig::Norm(max_grad_norm)))
            .init::<B, M>();

        info!(
            "Training for {} epochs of {} batches ({} steps)",
            num_epochs, batches_per_epoch, total_steps
        );

        let mut model = model;
        let mut summaries = Vec::with_capacity(num_epochs);
        let mut global_step = 0;
        let mut last_step = 0;

        for epoch in 0..num_epochs {
            let mut loss_hist = Vec::with_capacity(batches_per_epoch);
            let mut accuracy_hist = Vec::with_capacity(batches_per_epoch);
            let mut f1_hist = Vec::with_capacity(batches_per_epoch);

            for batch in self.dataloader_train.iter() {
                self.check_targets(&batch)?;

                let output = model.forward(batch.to_device(&self.device));
                let (preds, targets) = self.predictions(&output)?;

                let loss: f64 = output.loss.clone().into_scalar().elem();
                let accuracy = metrics::flat_accuracy(&preds, &targets);
                let f1_score = self.f1_score(&preds, &targets);

                let grads = output.loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);

                let lr = scheduler.step();

                self.sink.record_scalar("train/accuracy", accuracy, global_step);
                self.sink.record_scalar("train/f1_score", f1_score, global_step);
                self.sink.record_scalar("train/loss", loss, global_step);
                self.sink.record_scalar("train/learning_rate", lr, global_step);

                model = optimizer.step(lr, model, grads);

                last_step = global_step;
                global_step += 1;

                loss_hist.push(loss);
                accuracy_hist.push(accuracy);
                f1_hist.push(f1_score);
            }

            if loss_hist.is_empty() {
                return Err(TrainError::EmptyDataset("train"));
            }

            let (valid_loss, valid_accuracy, valid_f1) = self.validate(&model.valid())?;

            self.sink.record_scalar("validation/loss", valid_loss, last_step);
            self.sink.record_scalar("validation/accuracy", valid_accuracy, last_step);
            self.sink.record_scalar("validation/f1_score", valid_f1, last_step);

            let summary = EpochSummary {
                epoch,
                train_loss: mean(&loss_hist),
                train_accuracy: mean(&accuracy_hist),
                train_f1: mean(&f1_hist),
                valid_loss,
                valid_accuracy,
                valid_f1,
            };

            info!(
                "Epoch {}: train loss {:.4} accuracy {:.4} f1 {:.4} | validation loss {:.4} accuracy {:.4} f1 {:.4}",
                epoch + 1,
                summary.train_loss,
                summary.train_accuracy,
                summary.train_f1,
                summary.valid_loss,
                summary.valid_accuracy,
                summary.valid_f1
            );

            summaries.push(summary);
        }

        Ok((model, summaries))
    }

    /// Average loss and accuracy over validation batches, and F1 over every position
    fn validate<V: Model<B::InnerBackend>>(
        &self,
        model: &V,
    ) -> Result<(f64, f64, f64), TrainError> {
        let mut loss_sum = 0.0;
        let mut accuracy_sum = 0.0;
        let mut batches = 0;

        let mut all_preds = Vec::new();
        let mut all_targets = Vec::new();

        for batch in self.dataloader_valid.iter() {
            self.check_targets(&batch)?;

            let output = model.forward(batch.to_device(&self.device));
            let (preds, targets) = self.predictions(&output)?;

            let loss: f64 = output.loss.into_scalar().elem();

            loss_sum += loss;
            accuracy_sum += metrics::flat_accuracy(&preds, &targets);
            batches += 1;

            all_preds.extend(preds);
            all_targets.extend(targets);
        }

        if batches == 0 {
            return Err(TrainError::EmptyDataset("validation"));
        }

        Ok((
            loss_sum / batches as f64,
            accuracy_sum / batches as f64,
            self.f1_score(&all_preds, &all_targets),
        ))
    }

    /// Tagging schemas need one target per token, class schemas one target per example
    fn check_targets<BO: Backend>(&self, batch: &Batch<BO>) -> Result<(), TrainError> {
        let [batch_size, seq_length] = batch.input_ids.dims();
        let found = batch.targets.dims();

        let expected = if self.schema.is_tagging() {
            [batch_size, seq_length]
        } else {
            [batch_size, 1]
        };

        if found != expected {
            return Err(TrainError::Targets { expected, found });
        }

        Ok(())
    }

    /// Flatten argmax predictions and targets to host vectors, checking their shapes agree
    fn predictions<BO: Backend>(
        &self,
        output: &Output<BO>,
    ) -> Result<(Vec<i64>, Vec<i64>), TrainError> {
        let [batch_size, positions, num_labels] = output.logits.dims();
        let [target_batch_size, target_positions] = output.targets.dims();

        if batch_size != target_batch_size
            || positions != target_positions
            || num_labels != self.schema.len()
        {
            return Err(TrainError::Shape {
                logits: [batch_size, positions, num_labels],
                targets: [target_batch_size, target_positions],
            });
        }

        let preds = tensors::to_flat(output.logits.clone().argmax(2));
        let targets = tensors::to_flat(output.targets.clone());

        Ok((preds, targets))
    }

    /// Entity F1 for tagging schemas, F1 of the last class otherwise
    fn f1_score(&self, preds: &[i64], targets: &[i64]) -> f64 {
        if self.schema.is_tagging() {
            metrics::f1_score(&self.tags(targets), &self.tags(preds))
        } else {
            let positive = self.schema.len() as i64 - 1;

            metrics::binary_f1(preds, targets, positive)
        }
    }

    /// Map label ids back to label strings
    fn tags(&self, ids: &[i64]) -> Vec<&str> {
        ids.iter()
            .map(|id| self.schema.label(*id as usize).unwrap_or("O"))
            .collect()
    }
}

/// Build data loaders from the config and train a model
pub fn train<B, M>(
    model: M,
    dataset_train: FeatureSet,
    dataset_valid: FeatureSet,
    schema: &LabelSchema,
    config: &Config,
    device: B::Device,
    sink: &mut dyn Sink,
) -> Result<(M, Vec<EpochSummary>), TrainError>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Model<B>,
    M::InnerModule: Model<B::InnerBackend>,
{
    let dataloader_train = DataLoaderBuilder::<B, _, Batch<B>>::new(Batcher)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .set_device(device.clone())
        .build(dataset_train);

    let dataloader_valid = DataLoaderBuilder::<B::InnerBackend, _, Batch<B::InnerBackend>>::new(Batcher)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .set_device(device.clone())
        .build(dataset_valid);

    let optimizer = AdamWConfig::new()
        .with_epsilon(config.adam_epsilon)
        .with_weight_decay(config.weight_decay);

    Trainer::new(
        dataloader_train,
        dataloader_valid,
        schema,
        config.batch_size,
        device,
        sink,
    )
    .with_optimizer(optimizer)
    .fit(
        model,
        config.num_epochs,
        config.max_grad_norm,
        config.learning_rate,
        config.warmup_proportion,
    )
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().sum::<f64>() / values.len() as f64
}

/// Training Error
#[derive(thiserror::Error, Debug)]
pub enum TrainError {
    /// A split produced no batches
    #[error("the {0} split produced no batches")]
    EmptyDataset(&'static str),

    /// The model's logits and the batch targets disagree
    #[error("logits of shape {logits:?} do not match targets of shape {targets:?}")]
    Shape {
        /// [batch_size, positions, num_labels]
        logits: [usize; 3],
        /// [batch_size, positions]
        targets: [usize; 2],
    },

    /// The batch targets do not fit the schema's kind of labels
    #[error("targets of shape {found:?} where {expected:?} was expected")]
    Targets {
        /// The shape the schema calls for
        expected: [usize; 2],
        /// The shape of the batch targets
        found: [usize; 2],
    },

    /// The model scores a different number of labels than the schema holds
    #[error("the model scores {model} labels but the schema has {schema}")]
    LabelCount {
        /// The model's label count
        model: usize,
        /// The schema's label count
        schema: usize,
    },
}
