// Motor control for a single VESC-driven motor
//
// Provides:
// - Angle math on the 360° circle
// - Encoder frame <-> robot frame conversion
// - PD position controller
// - Transport contracts (frame decoder, command sink)
// - The stateful MotorController tying them together

pub mod angle;
mod controller;
pub mod frame;
pub mod pd;
pub mod sink;

pub use angle::{angle_difference, normalize_angle};
pub use controller::MotorController;
pub use frame::{EncoderDirection, MotorConfig, MotorError};
pub use pd::PdController;
pub use sink::{CommandQueue, CommandSink, DriverCommand, FrameDecoder};
