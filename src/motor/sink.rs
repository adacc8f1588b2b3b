// Contracts with the transport layer that talks to the speed controller
//
// The controller never frames bytes itself: a FrameDecoder turns incoming
// bytes into rotor positions, and a CommandSink takes outgoing commands.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One outbound driver instruction. Position and current are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverCommand {
    /// Hold a raw (encoder frame) angle, degrees
    SetPosition { raw_deg: f64 },
    /// Drive a current, amps
    SetCurrent { amps: f64 },
}

/// Fire-and-forget command output
pub trait CommandSink {
    fn set_position(&mut self, raw_deg: f64);
    fn set_current(&mut self, amps: f64);

    fn dispatch(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::SetPosition { raw_deg } => self.set_position(raw_deg),
            DriverCommand::SetCurrent { amps } => self.set_current(amps),
        }
    }
}

/// Byte-level frame decoder of the transport layer
pub trait FrameDecoder {
    /// Feed one byte received on `channel`. Returns true when a complete
    /// frame was assembled.
    fn process_byte(&mut self, channel: u8, byte: u8) -> bool;

    /// Rotor position (degrees, encoder frame) of the last complete frame
    fn rotor_position(&self) -> f64;
}

/// Buffers commands until the owning loop drains and sends them
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<DriverCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all queued commands, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = DriverCommand> + '_ {
        self.pending.drain(..)
    }

    pub fn last(&self) -> Option<&DriverCommand> {
        self.pending.back()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl CommandSink for CommandQueue {
    fn set_position(&mut self, raw_deg: f64) {
        self.pending.push_back(DriverCommand::SetPosition { raw_deg });
    }

    fn set_current(&mut self, amps: f64) {
        self.pending.push_back(DriverCommand::SetCurrent { amps });
    }
}
