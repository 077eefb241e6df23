//! Configuration types for the scheduling core.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the task manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Simulated days a calendar walk may go without doing any work before it
    /// gives up and uses the fallback result.
    pub stall_guard_days: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            stall_guard_days: 100,
        }
    }
}

impl SchedulingConfig {
    /// Convenience constructor for a given verbosity with default guards.
    pub fn with_verbosity(verbosity: u8) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }

    /// Stall guard as whole seconds.
    pub(crate) fn stall_guard_secs(&self) -> i64 {
        self.stall_guard_days.max(1) * crate::models::SECONDS_PER_DAY
    }
}
