// Conversion between the driver's encoder frame and the robot frame
//
// raw (encoder) --reflect if reversed--> +offset --> normalized (robot)
// normalized    --> -offset --reflect if reversed--> raw

use serde::{Deserialize, Serialize};

use super::angle::{normalize_angle, reflect_angle};

/// Error types for motor configuration
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Invalid encoder direction {0}: expected 1 or -1")]
    InvalidDirection(i8),

    #[error("Invalid encoder offset {0}: must be finite")]
    InvalidOffset(f64),

    #[error("Invalid max current {0}: must be finite and >= 0")]
    InvalidMaxCurrent(f64),

    #[error("Invalid sample rate {0} Hz: must be finite and > 0")]
    InvalidSampleRate(f64),
}

pub type Result<T> = std::result::Result<T, MotorError>;

/// Whether a raw-frame increase is a robot-frame increase
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderDirection {
    Forward = 1,
    Reversed = -1,
}

impl EncoderDirection {
    pub fn sign(self) -> i8 {
        self as i8
    }
}

impl TryFrom<i8> for EncoderDirection {
    type Error = MotorError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            1 => Ok(Self::Forward),
            -1 => Ok(Self::Reversed),
            other => Err(MotorError::InvalidDirection(other)),
        }
    }
}

/// Per-motor frame and current settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Degrees added to the (direction-corrected) raw angle to reach robot zero
    pub encoder_offset: f64,
    pub encoder_direction: EncoderDirection,
    /// Amps; the PD output in [-1, 1] is scaled by this
    pub max_current: f64,
}

impl MotorConfig {
    /// Validate and build a config. `direction` must be 1 or -1.
    pub fn new(encoder_offset: f64, direction: i8, max_current: f64) -> Result<Self> {
        if !encoder_offset.is_finite() {
            return Err(MotorError::InvalidOffset(encoder_offset));
        }
        if !max_current.is_finite() || max_current < 0.0 {
            return Err(MotorError::InvalidMaxCurrent(max_current));
        }

        Ok(Self {
            encoder_offset,
            encoder_direction: EncoderDirection::try_from(direction)?,
            max_current,
        })
    }

    /// Encoder frame -> robot frame, in [0, 360)
    pub fn to_normalized(&self, raw_angle: f64) -> f64 {
        let mut normalized = raw_angle;

        if self.encoder_direction == EncoderDirection::Reversed {
            normalized = reflect_angle(normalized);
        }

        normalize_angle(normalized + self.encoder_offset)
    }

    /// Robot frame -> encoder frame, in [0, 360). Inverse of `to_normalized`.
    pub fn to_raw(&self, normalized_angle: f64) -> f64 {
        let mut raw = normalized_angle - self.encoder_offset;

        if self.encoder_direction == EncoderDirection::Reversed {
            raw = reflect_angle(raw);
        }

        normalize_angle(raw)
    }
}
