// Message types exchanged over zenoh

use serde::{Deserialize, Serialize};

pub use crate::motor::DriverCommand;

// Position sample from the transport bridge -> runtime
// raw_deg is the rotor position in the speed controller's encoder frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionSample {
    pub raw_deg: f64,
}

// Target from teleop/scripts -> runtime
// Angles are in the robot frame, currents in amps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetCommand {
    /// Driver-side position hold
    Position { deg: f64 },
    /// Direct current
    Current { amps: f64 },
    /// Closed-loop position using the runtime's PD controller
    PidPosition { deg: f64 },
    /// Change PD gains, keeps the current target
    Gains { kp: f64, kd: f64 },
    /// New gains and a driver-side position hold
    PositionAndGains { kp: f64, ki: f64, kd: f64, deg: f64 },
}

impl TargetCommand {
    /// Whether holding this target relies on fresh position samples
    pub fn needs_feedback(&self) -> bool {
        matches!(self, TargetCommand::PidPosition { .. })
    }
}

/// Position controller internals, published as telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerDebug {
    /// Normalized PD output in [-1, 1]
    pub command: f64,
    /// Target - current, degrees
    pub error: f64,
    pub error_deriv: f64,
    /// Velocity estimate, deg/s
    pub velocity: f64,
    pub p_term: f64,
    pub d_term: f64,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    SampleStale,
}
