use csg_metric::Metric;
use serde::{Deserialize, Serialize};

/// Longest program the upstream decoder emits, in tokens.
pub const DEFAULT_MAX_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
    #[error("step schedule must not be empty")]
    EmptySchedule,
    #[error("step schedule entry {value} is not a positive finite number")]
    InvalidStep { value: f64 },
}

/// Knobs of one refinement call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub metric: Metric,
    /// Token budget for a program; longer candidates are rejected.
    pub max_len: usize,
    /// Largest stack depth the interpreter accepts.
    pub stack_size: usize,
    /// Maximum number of propose/accept rounds.
    pub max_iter: usize,
    /// Step sizes tried, in both directions, on every numeric leaf.
    pub step_schedule: Vec<f64>,
}

impl RefineConfig {
    /// Budget for programs of `max_len` tokens; the stack bound follows from the
    /// fact that a postfix binary program of that length holds at most
    /// `max_len / 2 + 1` canvases.
    pub fn for_max_len(max_len: usize) -> Self {
        Self {
            max_len,
            stack_size: max_len / 2 + 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_len == 0 {
            return Err(ConfigError::Zero { field: "max_len" });
        }
        if self.stack_size == 0 {
            return Err(ConfigError::Zero {
                field: "stack_size",
            });
        }
        if self.step_schedule.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        if let Some(&value) = self
            .step_schedule
            .iter()
            .find(|step| !(step.is_finite() && **step > 0.0))
        {
            return Err(ConfigError::InvalidStep { value });
        }
        Ok(())
    }
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Chamfer,
            max_len: DEFAULT_MAX_LEN,
            stack_size: DEFAULT_MAX_LEN / 2 + 1,
            max_iter: 1,
            step_schedule: vec![8.0, 4.0, 2.0, 1.0],
        }
    }
}
