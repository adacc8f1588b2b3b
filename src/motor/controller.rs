// Single-motor controller for a serial speed controller (VESC)
//
// Tracks the last raw rotor angle and a first-difference velocity estimate,
// converts angles between the encoder and robot frames, and emits position
// or current commands through a CommandSink.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::angle::{angle_difference, normalize_angle};
use super::frame::{MotorConfig, MotorError, Result};
use super::pd::PdController;
use super::sink::{CommandSink, FrameDecoder};
use crate::messages::ControllerDebug;

/// Single motor behind a speed controller
pub struct MotorController<S: CommandSink> {
    sink: S,
    config: MotorConfig,
    /// Transport channel this motor's frames arrive on
    channel: u8,
    /// Samples per second from the driver, scales the angle difference into deg/s
    sample_rate_hz: f64,

    /// Last raw angle, encoder frame, always in [0, 360)
    raw_angle: f64,
    /// deg/s from the last two samples
    velocity: f64,
    last_update: Option<Instant>,

    pos_controller: PdController,
}

impl<S: CommandSink> MotorController<S> {
    /// Create a configured controller. Angle and velocity start at 0.
    ///
    /// `sample_rate_hz` is how often the driver reports positions: a driver
    /// streaming at 1 kHz uses 1000.
    pub fn new(sink: S, config: MotorConfig, sample_rate_hz: f64) -> Result<Self> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(MotorError::InvalidSampleRate(sample_rate_hz));
        }

        info!(
            "Motor attached: offset={}, direction={:?}, max_current={}A, {}Hz samples",
            config.encoder_offset, config.encoder_direction, config.max_current, sample_rate_hz
        );

        Ok(Self {
            sink,
            config,
            channel: 0,
            sample_rate_hz,
            raw_angle: 0.0,
            velocity: 0.0,
            last_update: None,
            pos_controller: PdController::new(0.0, 0.0),
        })
    }

    /// Set the transport channel passed to the frame decoder
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set the initial PD gains
    pub fn with_gains(mut self, kp: f64, kd: f64) -> Self {
        self.pos_controller.set_gains(kp, kd);
        self
    }

    /// Replace the frame and current settings
    ///
    /// The new config is validated first; on error the old one stays.
    pub fn attach(&mut self, encoder_offset: f64, direction: i8, max_current: f64) -> Result<()> {
        let config = MotorConfig::new(encoder_offset, direction, max_current)?;
        info!(
            "Motor reconfigured: offset={}, direction={:?}, max_current={}A",
            config.encoder_offset, config.encoder_direction, config.max_current
        );
        self.config = config;
        Ok(())
    }

    /// Feed one transport byte to `decoder`, updating the angle when a
    /// frame completes. Returns true if it did.
    pub fn packet_process_byte<D: FrameDecoder>(&mut self, decoder: &mut D, byte: u8) -> bool {
        if decoder.process_byte(self.channel, byte) {
            self.update_angle(decoder.rotor_position());
            true
        } else {
            false
        }
    }

    /// Record a new raw position sample (degrees, encoder frame)
    ///
    /// Call on every sample: the velocity is the difference to the previous
    /// sample only, so a skipped sample shows up as a velocity spike.
    pub fn update_angle(&mut self, raw_sample: f64) {
        if !raw_sample.is_finite() {
            warn!("Non-finite position sample: {}", raw_sample);
        }

        let corrected = normalize_angle(raw_sample);

        // Shortest-path difference keeps 359 -> 1 at +2 degrees
        self.velocity = self.sample_rate_hz * angle_difference(self.raw_angle, corrected);
        self.raw_angle = corrected;
        self.last_update = Some(Instant::now());
    }

    /// Last measured angle in the robot frame. Not the commanded angle.
    pub fn read(&self) -> f64 {
        self.config.to_normalized(self.raw_angle)
    }

    /// Command a driver-side position hold at a robot-frame angle
    pub fn write(&mut self, deg: f64) {
        let raw = self.config.to_raw(deg);
        debug!("Position command: {} deg (raw {})", deg, raw);
        self.sink.set_position(raw);
    }

    /// Command a current in amps. Not limited by `max_current`.
    pub fn write_current(&mut self, amps: f64) {
        self.sink.set_current(amps);
    }

    /// Install new gains and hold a robot-frame position in one call
    ///
    /// `ki` is accepted for API compatibility but the controller is PD only.
    pub fn write_pos_and_pid_gains(&mut self, kp: f64, ki: f64, kd: f64, pos: f64) {
        if ki != 0.0 {
            debug!("Ignoring ki={}: position controller has no integral term", ki);
        }
        self.set_gains(kp, kd);
        self.write(pos);
    }

    /// Closed-loop step towards a raw-frame target; sends a current command
    pub fn pid_update(&mut self, raw_target: f64) {
        let error = angle_difference(self.raw_angle, raw_target);
        let command =
            self.config.max_current * self.pos_controller.compute_command(error, self.velocity);

        self.sink.set_current(command);
    }

    /// Closed-loop step towards a robot-frame target
    pub fn pid_update_normalized(&mut self, target: f64) {
        self.pid_update(self.config.to_raw(target));
    }

    /// Update PD gains for the next `pid_update`
    pub fn set_gains(&mut self, kp: f64, kd: f64) {
        debug!("PD gains set: kp={}, kd={}", kp, kd);
        self.pos_controller.set_gains(kp, kd);
    }

    /// Controller internals from the last `pid_update`
    pub fn debug_snapshot(&self) -> ControllerDebug {
        let (p_term, d_term) = self.pos_controller.get_error_terms();
        ControllerDebug {
            command: self.pos_controller.get_command(),
            error: self.pos_controller.get_error(),
            error_deriv: self.pos_controller.get_error_deriv(),
            velocity: self.velocity,
            p_term,
            d_term,
        }
    }

    pub fn raw_angle(&self) -> f64 {
        self.raw_angle
    }

    /// deg/s
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn gains(&self) -> (f64, f64) {
        self.pos_controller.gains()
    }

    /// When the last sample arrived, if any
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Time since the last sample, None before the first one
    pub fn sample_age(&self) -> Option<Duration> {
        self.last_update.map(|t| t.elapsed())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::sink::{CommandQueue, DriverCommand};

    const EPS: f64 = 1e-9;

    fn controller(
        offset: f64,
        direction: i8,
        max_current: f64,
        rate: f64,
    ) -> MotorController<CommandQueue> {
        let config = MotorConfig::new(offset, direction, max_current).unwrap();
        MotorController::new(CommandQueue::new(), config, rate).unwrap()
    }

    fn last(ctrl: &MotorController<CommandQueue>) -> DriverCommand {
        *ctrl.sink().last().expect("no command dispatched")
    }

    /// Decoder that completes a frame on every 0x03 byte, reporting a fixed angle
    struct StubDecoder {
        angle: f64,
        channels: Vec<u8>,
    }

    impl FrameDecoder for StubDecoder {
        fn process_byte(&mut self, channel: u8, byte: u8) -> bool {
            self.channels.push(channel);
            byte == 0x03
        }

        fn rotor_position(&self) -> f64 {
            self.angle
        }
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        let config = MotorConfig::new(0.0, 1, 1.0).unwrap();
        for rate in [0.0, -1000.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                MotorController::new(CommandQueue::new(), config, rate),
                Err(MotorError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_starts_at_zero() {
        let ctrl = controller(0.0, 1, 1.0, 1000.0);
        assert_eq!(ctrl.raw_angle(), 0.0);
        assert_eq!(ctrl.velocity(), 0.0);
        assert!(ctrl.last_update().is_none());
        assert!(ctrl.sample_age().is_none());
    }

    #[test]
    fn test_velocity_from_two_samples() {
        let mut ctrl = controller(0.0, 1, 1.0, 1000.0);
        ctrl.update_angle(10.0);
        ctrl.update_angle(15.0);
        assert!((ctrl.velocity() - 5000.0).abs() < EPS);

        ctrl.update_angle(12.0);
        assert!((ctrl.velocity() + 3000.0).abs() < EPS);
    }

    #[test]
    fn test_velocity_across_wrap() {
        let mut ctrl = controller(0.0, 1, 1.0, 500.0);
        ctrl.update_angle(359.0);
        ctrl.update_angle(1.0);
        assert!((ctrl.velocity() - 1000.0).abs() < EPS);

        ctrl.update_angle(359.0);
        assert!((ctrl.velocity() + 1000.0).abs() < EPS);
    }

    #[test]
    fn test_sample_is_normalized() {
        let mut ctrl = controller(0.0, 1, 1.0, 1000.0);
        ctrl.update_angle(-10.0);
        assert_eq!(ctrl.raw_angle(), 350.0);
        ctrl.update_angle(725.0);
        assert_eq!(ctrl.raw_angle(), 5.0);
        assert!(ctrl.last_update().is_some());
    }

    #[test]
    fn test_read_and_write_frames() {
        let mut ctrl = controller(10.0, 1, 5.0, 1000.0);
        ctrl.update_angle(350.0);
        ctrl.update_angle(355.0);
        assert_eq!(ctrl.read(), 5.0);

        ctrl.write(15.0);
        assert_eq!(last(&ctrl), DriverCommand::SetPosition { raw_deg: 5.0 });
    }

    #[test]
    fn test_read_reversed() {
        let mut ctrl = controller(0.0, -1, 1.0, 1000.0);
        ctrl.update_angle(90.0);
        assert_eq!(ctrl.read(), 270.0);
    }

    #[test]
    fn test_write_current_not_clamped() {
        let mut ctrl = controller(0.0, 1, 2.0, 1000.0);
        ctrl.write_current(7.5);
        assert_eq!(last(&ctrl), DriverCommand::SetCurrent { amps: 7.5 });
    }

    #[test]
    fn test_pid_update_bounded_by_max_current() {
        let mut ctrl = controller(0.0, 1, 4.0, 1000.0).with_gains(1.0, 0.0);
        ctrl.update_angle(0.0);

        ctrl.pid_update(90.0);
        assert_eq!(last(&ctrl), DriverCommand::SetCurrent { amps: 4.0 });

        ctrl.pid_update(270.0); // shortest way is -90
        assert_eq!(last(&ctrl), DriverCommand::SetCurrent { amps: -4.0 });
    }

    #[test]
    fn test_pid_update_uses_shortest_error() {
        let mut ctrl = controller(0.0, 1, 10.0, 1000.0).with_gains(0.01, 0.0);
        ctrl.update_angle(350.0);
        ctrl.update_angle(350.0);

        ctrl.pid_update(10.0);
        let snap = ctrl.debug_snapshot();
        assert!((snap.error - 20.0).abs() < EPS);
        match last(&ctrl) {
            DriverCommand::SetCurrent { amps } => assert!((amps - 2.0).abs() < EPS),
            other => panic!("expected current command, got {:?}", other),
        }
    }

    #[test]
    fn test_pid_derivative_uses_velocity_estimate() {
        let mut ctrl = controller(0.0, 1, 1.0, 100.0).with_gains(0.0, 0.001);
        ctrl.update_angle(0.0);
        ctrl.update_angle(2.0); // 200 deg/s

        ctrl.pid_update(2.0);
        let snap = ctrl.debug_snapshot();
        assert!((snap.velocity - 200.0).abs() < EPS);
        assert!((snap.error_deriv + 200.0).abs() < EPS);
        assert!((snap.command + 0.2).abs() < EPS);
        assert!((snap.d_term + 0.2).abs() < EPS);
        assert_eq!(snap.p_term, 0.0);
    }

    #[test]
    fn test_pid_update_normalized_converts_target() {
        // Reversed with offset: robot 15 -> raw 30
        let mut ctrl = controller(45.0, -1, 1.0, 1000.0).with_gains(0.01, 0.0);
        ctrl.update_angle(0.0);

        ctrl.pid_update_normalized(15.0);
        assert!((ctrl.debug_snapshot().error - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_attach_reconfigures_or_keeps_old() {
        let mut ctrl = controller(0.0, 1, 1.0, 1000.0);
        ctrl.update_angle(100.0);

        ctrl.attach(20.0, -1, 3.0).unwrap();
        assert_eq!(ctrl.config().max_current, 3.0);
        assert!((ctrl.read() - 280.0).abs() < EPS);

        assert!(ctrl.attach(0.0, 0, 1.0).is_err());
        assert_eq!(ctrl.config().encoder_offset, 20.0);
        assert_eq!(ctrl.config().max_current, 3.0);
    }

    #[test]
    fn test_write_pos_and_pid_gains() {
        let mut ctrl = controller(10.0, 1, 1.0, 1000.0);
        ctrl.write_pos_and_pid_gains(0.2, 0.5, 0.01, 15.0);

        assert_eq!(ctrl.gains(), (0.2, 0.01));
        assert_eq!(last(&ctrl), DriverCommand::SetPosition { raw_deg: 5.0 });
    }

    #[test]
    fn test_packet_process_byte() {
        let mut ctrl = controller(0.0, 1, 1.0, 1000.0).with_channel(4);
        let mut decoder = StubDecoder {
            angle: 42.0,
            channels: Vec::new(),
        };

        assert!(!ctrl.packet_process_byte(&mut decoder, 0x02));
        assert_eq!(ctrl.raw_angle(), 0.0);

        assert!(ctrl.packet_process_byte(&mut decoder, 0x03));
        assert_eq!(ctrl.raw_angle(), 42.0);
        assert_eq!(decoder.channels, vec![4, 4]);
    }

    #[test]
    fn test_nan_sample_never_halts() {
        let mut ctrl = controller(0.0, 1, 1.0, 1000.0).with_gains(1.0, 1.0);
        ctrl.update_angle(f64::NAN);
        assert!(ctrl.read().is_nan());

        ctrl.pid_update(10.0);
        assert_eq!(ctrl.sink().len(), 1);
    }
}
