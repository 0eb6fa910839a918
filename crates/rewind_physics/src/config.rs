//! # Scene Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid 60 Hz scene.
//!
//! ```toml
//! tick_rate_hz = 60
//! max_ticks_per_frame = 16
//! history_capacity = 60
//! bodies_sleep_by_default = false
//! ```

use std::path::Path;

use rewind_shared::{COMMAND_QUEUE_RESERVE, HISTORY_CAPACITY, MAX_TICKS_PER_FRAME, NANOS_PER_SECOND, TICK_RATE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-scene scheduler settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Simulation ticks per second.
    pub tick_rate_hz: u32,
    /// Catch-up bound: most ticks run by one `step()`.
    pub max_ticks_per_frame: u32,
    /// Ticks of history retained for rollback.
    pub history_capacity: usize,
    /// Collision sub-steps are chosen so each covers at most one period of
    /// this rate.
    pub reference_collision_rate_hz: u32,
    /// Integration sub-steps per collision step.
    pub integration_steps: u32,
    /// `AddBody` leaves bodies asleep.
    pub bodies_sleep_by_default: bool,
    /// Template scenes hold bodies but never simulate.
    pub is_template: bool,
    /// Always queue mutations, never apply them directly.
    pub always_defer_commands: bool,
    /// Soft reserve of the generic command queue.
    pub command_queue_reserve: usize,
    /// Extrapolate published transforms by the leftover fraction of a tick.
    pub interpolate_presentation: bool,
    /// Forward contact-persisted events as well as added/removed.
    pub forward_persisted_contacts: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE,
            max_ticks_per_frame: MAX_TICKS_PER_FRAME,
            history_capacity: HISTORY_CAPACITY,
            reference_collision_rate_hz: TICK_RATE,
            integration_steps: 1,
            bodies_sleep_by_default: false,
            is_template: false,
            always_defer_commands: false,
            command_queue_reserve: COMMAND_QUEUE_RESERVE,
            interpolate_presentation: true,
            forward_persisted_contacts: false,
        }
    }
}

impl SceneConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be positive".into()));
        }
        if u64::from(self.tick_rate_hz) > NANOS_PER_SECOND {
            return Err(ConfigError::Invalid("tick_rate_hz exceeds nanosecond resolution".into()));
        }
        if self.reference_collision_rate_hz == 0 {
            return Err(ConfigError::Invalid("reference_collision_rate_hz must be positive".into()));
        }
        if self.max_ticks_per_frame == 0 {
            return Err(ConfigError::Invalid("max_ticks_per_frame must be at least 1".into()));
        }
        if self.history_capacity < 2 {
            return Err(ConfigError::Invalid("history_capacity must be at least 2".into()));
        }
        if self.integration_steps == 0 {
            return Err(ConfigError::Invalid("integration_steps must be at least 1".into()));
        }
        Ok(())
    }

    /// Tick duration in nanoseconds.
    #[must_use]
    pub fn tick_duration(&self) -> u64 {
        NANOS_PER_SECOND / u64::from(self.tick_rate_hz.max(1))
    }

    /// Collision steps per tick: the tick split into pieces no longer than
    /// one reference period.
    #[must_use]
    pub fn collision_steps(&self) -> u32 {
        let reference = NANOS_PER_SECOND / u64::from(self.reference_collision_rate_hz.max(1));
        let steps = self.tick_duration().div_ceil(reference.max(1));
        u32::try_from(steps.max(1)).unwrap_or(u32::MAX)
    }
}
