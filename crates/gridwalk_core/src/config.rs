//! Movement tuning.
//!
//! Durations are written in seconds in config files and converted to whole
//! simulation ticks once, so the tick loop itself only counts integers.
//!
//! # Example RON
//!
//! ```ron
//! MovementConfig(
//!     pacing: Speed("4"),
//!     step_delay: "0.2",
//!     reroute_radius: 5,
//!     tick_rate: 20,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalkError};
use crate::grid::GridCoordinate;
use crate::math::{fixed_decimal, Fixed};
use crate::resolver::DEFAULT_REROUTE_RADIUS;

/// Default simulation tick rate (ticks per second).
pub const DEFAULT_TICK_RATE: u32 = 20;

/// How long a single step takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPacing {
    /// Every step takes this many seconds, whatever its length.
    FixedDuration(#[serde(with = "fixed_decimal")] Fixed),
    /// Steps take `distance / speed` seconds (cells per second).
    Speed(#[serde(with = "fixed_decimal")] Fixed),
}

impl Default for StepPacing {
    fn default() -> Self {
        Self::Speed(Fixed::from_num(4))
    }
}

/// Tunable movement parameters shared by every mover in a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Step pacing rule.
    pub pacing: StepPacing,
    /// Rest time on each reached cell, in seconds.
    #[serde(with = "fixed_decimal")]
    pub step_delay: Fixed,
    /// Largest probe distance for the reroute search.
    pub reroute_radius: u32,
    /// Simulation ticks per second.
    pub tick_rate: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            pacing: StepPacing::default(),
            step_delay: Fixed::from_num(2) / Fixed::from_num(10),
            reroute_radius: DEFAULT_REROUTE_RADIUS,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl MovementConfig {
    /// Parse a config from RON and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|e| WalkError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the tick loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        match self.pacing {
            StepPacing::FixedDuration(seconds) if seconds <= Fixed::ZERO => {
                return Err(WalkError::InvalidConfig(format!(
                    "step duration must be positive, got {seconds}"
                )));
            }
            StepPacing::Speed(speed) if speed <= Fixed::ZERO => {
                return Err(WalkError::InvalidConfig(format!(
                    "speed must be positive, got {speed}"
                )));
            }
            _ => {}
        }

        if self.step_delay < Fixed::ZERO {
            return Err(WalkError::InvalidConfig(format!(
                "step delay must not be negative, got {}",
                self.step_delay
            )));
        }
        if self.reroute_radius == 0 {
            return Err(WalkError::InvalidConfig(
                "reroute radius must be at least 1".into(),
            ));
        }
        if self.tick_rate == 0 {
            return Err(WalkError::InvalidConfig("tick rate must be positive".into()));
        }
        Ok(())
    }

    /// Convert seconds to the nearest whole number of ticks.
    #[must_use]
    pub fn seconds_to_ticks(&self, seconds: Fixed) -> u32 {
        let ticks = seconds.saturating_mul(Fixed::from_num(self.tick_rate));
        ticks.saturating_round().max(Fixed::ZERO).to_num::<u32>()
    }

    /// Ticks needed to travel from `from` to `to` (at least one).
    #[must_use]
    pub fn step_ticks(&self, from: GridCoordinate, to: GridCoordinate) -> u32 {
        let seconds = match self.pacing {
            StepPacing::FixedDuration(seconds) => seconds,
            StepPacing::Speed(speed) => from.to_world().distance(to.to_world()) / speed,
        };
        self.seconds_to_ticks(seconds).max(1)
    }

    /// Rest ticks applied after every step.
    #[must_use]
    pub fn delay_ticks(&self) -> u32 {
        self.seconds_to_ticks(self.step_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> GridCoordinate {
        GridCoordinate::new(x, y)
    }

    #[test]
    fn test_default_is_valid() {
        let config = MovementConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reroute_radius, 5);
        assert_eq!(config.tick_rate, 20);
    }

    #[test]
    fn test_default_timing() {
        let config = MovementConfig::default();
        // 1 cell at 4 cells/s = 0.25 s = 5 ticks at 20 Hz.
        assert_eq!(config.step_ticks(c(0, 0), c(1, 0)), 5);
        // 0.2 s = 4 ticks.
        assert_eq!(config.delay_ticks(), 4);
    }

    #[test]
    fn test_speed_pacing_scales_with_distance() {
        let config = MovementConfig {
            pacing: StepPacing::Speed(Fixed::ONE),
            step_delay: Fixed::ZERO,
            tick_rate: 10,
            ..Default::default()
        };
        assert_eq!(config.step_ticks(c(0, 0), c(1, 0)), 10);
        assert_eq!(config.step_ticks(c(0, 0), c(3, 4)), 50);
        assert_eq!(config.delay_ticks(), 0);
    }

    #[test]
    fn test_fixed_pacing_ignores_distance() {
        let config = MovementConfig {
            pacing: StepPacing::FixedDuration(Fixed::ONE / Fixed::from_num(2)),
            ..Default::default()
        };
        assert_eq!(config.step_ticks(c(0, 0), c(1, 0)), 10);
        assert_eq!(config.step_ticks(c(0, 0), c(0, 9)), 10);
    }

    #[test]
    fn test_tiny_durations_take_one_tick() {
        let config = MovementConfig {
            pacing: StepPacing::Speed(Fixed::from_num(1000)),
            ..Default::default()
        };
        assert_eq!(config.step_ticks(c(0, 0), c(1, 0)), 1);
    }

    #[test]
    fn test_from_ron() {
        let config = MovementConfig::from_ron_str(
            r#"MovementConfig(pacing: FixedDuration("0.5"), step_delay: "0", reroute_radius: 3)"#,
        )
        .unwrap();
        assert_eq!(
            config.pacing,
            StepPacing::FixedDuration(Fixed::ONE / Fixed::from_num(2))
        );
        assert_eq!(config.step_delay, Fixed::ZERO);
        assert_eq!(config.reroute_radius, 3);
        assert_eq!(config.tick_rate, DEFAULT_TICK_RATE);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_speed = MovementConfig {
            pacing: StepPacing::Speed(Fixed::ZERO),
            ..Default::default()
        };
        assert!(matches!(
            bad_speed.validate(),
            Err(WalkError::InvalidConfig(_))
        ));

        let bad_radius = MovementConfig {
            reroute_radius: 0,
            ..Default::default()
        };
        assert!(bad_radius.validate().is_err());

        let bad_rate = MovementConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());

        assert!(MovementConfig::from_ron_str("MovementConfig(step_delay: \"-1\")").is_err());
        assert!(MovementConfig::from_ron_str("not ron at all").is_err());
    }
}
