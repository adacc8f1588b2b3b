// Fixed-rate control loop with watchdog
// Samples and targets arrive over zenoh; every tick the latest target is
// turned into one driver command and published for the transport bridge.
// If targets stop arriving, or position samples stop while holding a
// closed-loop target, the motor is commanded to zero current.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{
    Args, CMD_TIMEOUT, DEBUG_EVERY, LOOP_HZ, SAMPLE_TIMEOUT, TOPIC_CMD, TOPIC_DEBUG, TOPIC_DRIVER,
    TOPIC_HEALTH, TOPIC_SAMPLE,
};
use crate::messages::{ControllerDebug, DriverCommand, PositionSample, RuntimeHealth, TargetCommand};
use crate::motor::{CommandQueue, MotorController};
use crate::telemetry::DebugSampler;

pub struct Runtime {
    motor: MotorController<CommandQueue>,
    target: Option<TargetCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
    sampler: DebugSampler,
}

impl Runtime {
    pub fn new(motor: MotorController<CommandQueue>) -> Self {
        Self {
            motor,
            target: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            sampler: DebugSampler::new(DEBUG_EVERY),
        }
    }

    /// Process incoming position sample
    pub fn on_sample(&mut self, sample: PositionSample) {
        self.motor.update_angle(sample.raw_deg);
    }

    /// Process incoming target
    pub fn on_command(&mut self, cmd: TargetCommand) {
        info!("Received command: {:?}", &cmd);
        self.cmd_received_at = Instant::now();

        match cmd {
            // Gains change the controller, not what it is tracking
            TargetCommand::Gains { kp, kd } => self.motor.set_gains(kp, kd),
            TargetCommand::PositionAndGains { kp, ki, kd, deg } => {
                self.motor.write_pos_and_pid_gains(kp, ki, kd, deg);
                self.target = Some(TargetCommand::Position { deg });
            }
            other => self.target = Some(other),
        }
    }

    /// Compute this tick's driver commands based on watchdog state
    pub fn step(&mut self) -> Vec<DriverCommand> {
        self.step_at(self.cmd_received_at.elapsed(), self.motor.sample_age())
    }

    fn step_at(&mut self, cmd_age: Duration, sample_age: Option<Duration>) -> Vec<DriverCommand> {
        let samples_fresh = sample_age.is_some_and(|age| age <= SAMPLE_TIMEOUT);

        match self.target {
            _ if cmd_age > CMD_TIMEOUT => {
                // Watchdog triggered - release the motor
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({:?} old), releasing motor", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                self.motor.write_current(0.0);
            }
            Some(target) if target.needs_feedback() && !samples_fresh => {
                if self.health != RuntimeHealth::SampleStale {
                    warn!("Position samples stale ({:?}), releasing motor", sample_age);
                }
                self.health = RuntimeHealth::SampleStale;
                self.motor.write_current(0.0);
            }
            Some(target) => {
                self.health = RuntimeHealth::Ok;
                self.apply(target);
            }
            None => {
                // No command ever received
                self.health = RuntimeHealth::CmdStale;
                self.motor.write_current(0.0);
            }
        }

        self.motor.sink_mut().drain().collect()
    }

    fn apply(&mut self, target: TargetCommand) {
        match target {
            TargetCommand::Position { deg } => self.motor.write(deg),
            TargetCommand::Current { amps } => self.motor.write_current(amps),
            TargetCommand::PidPosition { deg } => self.motor.pid_update_normalized(deg),
            // Never stored as a target
            TargetCommand::Gains { .. } | TargetCommand::PositionAndGains { .. } => {}
        }
    }

    /// Controller snapshot when the debug sampler lets one through
    pub fn debug_sample(&mut self) -> Option<ControllerDebug> {
        let snapshot = self.motor.debug_snapshot();
        self.sampler.sample(snapshot)
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn motor(&self) -> &MotorController<CommandQueue> {
        &self.motor
    }
}

pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let motor = MotorController::new(CommandQueue::new(), args.motor_config()?, args.sample_rate)?
        .with_channel(args.channel)
        .with_gains(args.kp, args.kd);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_cmd = session.declare_subscriber(args.topic(TOPIC_CMD)).await?;
    let sub_sample = session.declare_subscriber(args.topic(TOPIC_SAMPLE)).await?;
    let pub_driver = session.declare_publisher(args.topic(TOPIC_DRIVER)).await?;
    let pub_health = session.declare_publisher(args.topic(TOPIC_HEALTH)).await?;
    let pub_debug = session.declare_publisher(args.topic(TOPIC_DEBUG)).await?;

    let mut runtime = Runtime::new(motor);
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms command timeout, {}ms sample timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis(),
        SAMPLE_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}, {}", args.topic(TOPIC_CMD), args.topic(TOPIC_SAMPLE));
    info!(
        "Publishing to: {}, {}, {}",
        args.topic(TOPIC_DRIVER),
        args.topic(TOPIC_HEALTH),
        args.topic(TOPIC_DEBUG)
    );

    loop {
        tick.tick().await;

        // 1. Drain all pending samples in arrival order (each one updates the velocity)
        while let Ok(Some(sample)) = sub_sample.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<PositionSample>(&payload) {
                Ok(sample) => runtime.on_sample(sample),
                Err(e) => warn!("Failed to parse position sample: {}", e),
            }
        }

        // 2. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_cmd.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<TargetCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 3. Compute driver commands (includes watchdog logic) and publish them
        for cmd in runtime.step() {
            pub_driver.put(serde_json::to_string(&cmd)?).await?;
        }

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;

        // 5. Publish controller internals, rate limited
        if let Some(snapshot) = runtime.debug_sample() {
            pub_debug.put(serde_json::to_string(&snapshot)?).await?;
        }
    }
}
