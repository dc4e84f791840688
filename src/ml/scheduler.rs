use serde::{Deserialize, Serialize};

/// Step decay: the learning rate is multiplied by `gamma` every
/// `step_size` calls to `step()`. Stepped once per training phase,
/// so `step_size` counts epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLr {
    initial_lr: f64,
    step_size:  usize,
    gamma:      f64,
    steps:      usize,
}

impl StepLr {
    pub fn new(initial_lr: f64, step_size: usize, gamma: f64) -> Self {
        Self { initial_lr, step_size: step_size.max(1), gamma, steps: 0 }
    }

    /// Learning rate for the current epoch.
    pub fn current(&self) -> f64 {
        let decays = (self.steps / self.step_size) as i32;
        self.initial_lr * self.gamma.powi(decays)
    }

    /// Advance one epoch and return the new rate.
    pub fn step(&mut self) -> f64 {
        self.steps += 1;
        self.current()
    }
}
