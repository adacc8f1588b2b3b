// Timeouts, topics, motor configuration
use clap::Parser;
use std::time::Duration;

use crate::motor::{MotorConfig, MotorError};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 200;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Position samples older than this make closed-loop control unsafe
pub const SAMPLE_TIMEOUT: Duration = Duration::from_millis(50);

// Zenoh topics, relative to the key prefix
pub const TOPIC_CMD: &str = "cmd"; // targets
pub const TOPIC_SAMPLE: &str = "rt/position"; // position samples from the bridge
pub const TOPIC_DRIVER: &str = "rt/driver"; // commands to the bridge
pub const TOPIC_HEALTH: &str = "state/health"; // health status
pub const TOPIC_DEBUG: &str = "state/debug"; // controller internals

// Motor configuration
// The VESC streams rotor position at 1 kHz
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 1000.0;

// Publish one controller snapshot every N loop ticks
pub const DEBUG_EVERY: u32 = 100;

/// Command-line settings for one motor
#[derive(Debug, Clone, Parser)]
#[command(name = "vesc-motor-runtime", about = "Control loop for a single VESC motor")]
pub struct Args {
    /// Zenoh key prefix, e.g. "robot/hip"
    #[arg(long, default_value = "vesc/0")]
    pub prefix: String,

    /// Degrees added to the encoder angle to reach robot zero
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset: f64,

    /// 1 if the encoder counts the same way as the robot frame, -1 otherwise
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub direction: i8,

    /// Current limit for closed-loop control, amps
    #[arg(long, default_value_t = 5.0)]
    pub max_current: f64,

    /// Position samples per second sent by the VESC
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
    pub sample_rate: f64,

    /// Proportional gain (normalized output per degree)
    #[arg(long, default_value_t = 0.0)]
    pub kp: f64,

    /// Derivative gain (normalized output per deg/s)
    #[arg(long, default_value_t = 0.0)]
    pub kd: f64,

    /// Transport channel of this motor
    #[arg(long, default_value_t = 0)]
    pub channel: u8,
}

impl Args {
    pub fn motor_config(&self) -> Result<MotorConfig, MotorError> {
        MotorConfig::new(self.offset, self.direction, self.max_current)
    }

    /// Full key for a topic under this motor's prefix
    pub fn topic(&self, topic: &str) -> String {
        format!("{}/{}", self.prefix.trim_end_matches('/'), topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["vesc-motor-runtime"]);
        assert_eq!(args.direction, 1);
        assert_eq!(args.sample_rate, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(args.topic(TOPIC_CMD), "vesc/0/cmd");
        assert!(args.motor_config().is_ok());
    }

    #[test]
    fn test_args_reversed_motor() {
        let args = Args::parse_from([
            "vesc-motor-runtime",
            "--prefix",
            "robot/hip/",
            "--offset",
            "-12.5",
            "--direction",
            "-1",
        ]);
        let config = args.motor_config().unwrap();
        assert_eq!(config.encoder_offset, -12.5);
        assert_eq!(args.topic(TOPIC_HEALTH), "robot/hip/state/health");
    }

    #[test]
    fn test_args_bad_direction() {
        let args = Args::parse_from(["vesc-motor-runtime", "--direction", "2"]);
        assert!(args.motor_config().is_err());
    }
}
