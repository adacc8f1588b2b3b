// Control runtime for a single motor behind a VESC speed controller
//
// The transport bridge publishes rotor positions and executes driver
// commands; this crate keeps the angle/velocity state and decides what to
// command.

pub mod config;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod telemetry;
