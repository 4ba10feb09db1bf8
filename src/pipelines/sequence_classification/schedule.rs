use burn::{lr_scheduler::LrScheduler, optim::LearningRate, tensor::backend::Backend};

/// Linear warmup to the base learning rate followed by linear decay towards zero.
///
/// As an `LrScheduler`, each `step` returns the rate for the current global step and advances it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmupLinear {
    base_lr: LearningRate,
    warmup_proportion: f64,
    total_steps: usize,
    current_step: usize,
}

impl WarmupLinear {
    /// Create a schedule that warms up over the first `warmup_proportion` of `total_steps`
    pub fn new(base_lr: LearningRate, warmup_proportion: f64, total_steps: usize) -> Self {
        Self {
            base_lr,
            warmup_proportion,
            total_steps,
            current_step: 0,
        }
    }

    /// The learning rate for a global step
    pub fn lr(&self, step: usize) -> LearningRate {
        if self.total_steps == 0 {
            return self.base_lr;
        }

        let progress = step as f64 / self.total_steps as f64;

        let factor = if progress < self.warmup_proportion {
            progress / self.warmup_proportion
        } else {
            (1.0 - progress).max(0.0)
        };

        self.base_lr * factor
    }

    /// The number of steps spent warming up
    pub fn warmup_steps(&self) -> f64 {
        self.warmup_proportion * self.total_steps as f64
    }
}

impl LrScheduler for WarmupLinear {
    type Record<B: Backend> = usize;

    fn step(&mut self) -> LearningRate {
        let lr = self.lr(self.current_step);
        self.current_step += 1;

        lr
    }

    fn to_record<B: Backend>(&self) -> Self::Record<B> {
        self.current_step
    }

    fn load_record<B: Backend>(mut self, record: Self::Record<B>) -> Self {
        self.current_step = record;
        self
    }
}
