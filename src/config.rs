use clap::Parser;

use crate::{
    camera::{Camera, CameraController, MovementPolicy},
    encoder::MAX_CAPACITY,
};

/// Real-time GPU ray-traced preview of a random sphere scene.
#[derive(Parser, Debug)]
#[command(name = "sphere_tracer", version, about)]
pub struct Args {
    /// Seed for scene generation; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of spheres to generate.
    #[arg(long, default_value_t = 32)]
    pub spheres: usize,

    /// Sphere image capacity.
    #[arg(long, default_value_t = 32)]
    pub capacity: u32,

    /// Initial viewport width.
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial viewport height.
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Degrees of rotation per pointer unit while looking.
    #[arg(long, default_value_t = CameraController::DEFAULT_SENSITIVITY)]
    pub sensitivity: f32,

    /// Movement speed in world units per second.
    #[arg(long, default_value_t = Camera::DEFAULT_SPEED)]
    pub speed: f32,

    /// Smooth movement, closing this fraction of the gap per second.
    #[arg(long)]
    pub smoothing: Option<f32>,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sphere capacity must be within 1..={max}, got {0}", max = MAX_CAPACITY)]
    Capacity(u32),
    #[error("viewport must be non-empty, got {width}x{height}")]
    Viewport { width: u32, height: u32 },
    #[error("{name} must be a positive number, got {value}")]
    NotPositive { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    pub seed: u64,
    pub sphere_count: usize,
    pub capacity: u32,
    pub width: u32,
    pub height: u32,
    pub sensitivity: f32,
    pub speed: f32,
    pub movement: MovementPolicy,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            sphere_count: 32,
            capacity: 32,
            width: 800,
            height: 600,
            sensitivity: CameraController::DEFAULT_SENSITIVITY,
            speed: Camera::DEFAULT_SPEED,
            movement: MovementPolicy::Immediate,
        }
    }
}

impl TracerConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let movement = match args.smoothing {
            Some(factor) => MovementPolicy::Smoothed { factor },
            None => MovementPolicy::Immediate,
        };
        let config = Self {
            seed: args.seed.unwrap_or_else(rand::random),
            sphere_count: args.spheres,
            capacity: args.capacity,
            width: args.width,
            height: args.height,
            sensitivity: args.sensitivity,
            speed: args.speed,
            movement,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sphere count is not checked against capacity; overflow surfaces as an
    /// encode failure when the scene is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::Capacity(self.capacity));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Viewport {
                width: self.width,
                height: self.height,
            });
        }
        positive("sensitivity", self.sensitivity)?;
        positive("speed", self.speed)?;
        if let MovementPolicy::Smoothed { factor } = self.movement {
            positive("smoothing", factor)?;
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("sphere_tracer").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_scene_defaults() {
        let config = TracerConfig::from_args(&parse(&["--seed", "9"])).unwrap();
        assert_eq!(
            config,
            TracerConfig {
                seed: 9,
                ..TracerConfig::default()
            }
        );
    }

    #[test]
    fn smoothing_selects_policy() {
        let config = TracerConfig::from_args(&parse(&["--smoothing", "4"])).unwrap();
        assert_eq!(config.movement, MovementPolicy::Smoothed { factor: 4.0 });
    }

    #[test]
    fn rejects_invalid_values() {
        let err = TracerConfig::from_args(&parse(&["--capacity", "2048"])).unwrap_err();
        assert_eq!(err, ConfigError::Capacity(2048));

        let err = TracerConfig::from_args(&parse(&["--width", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::Viewport { width: 0, .. }));

        let err = TracerConfig::from_args(&parse(&["--speed=-1"])).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { name: "speed", .. }));
    }

    #[test]
    fn sphere_count_may_exceed_capacity() {
        let config = TracerConfig {
            sphere_count: 40,
            ..TracerConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
