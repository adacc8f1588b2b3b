// Keyboard jog: Left/Right step target, Up/Down step size, P toggle PID, Space release, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::info;

use vesc_motor_runtime::config::TOPIC_CMD;
use vesc_motor_runtime::messages::TargetCommand;
use vesc_motor_runtime::motor::normalize_angle;

const STEPS: [f64; 4] = [1.0, 5.0, 15.0, 45.0]; // degrees

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let prefix = std::env::args().nth(1).unwrap_or_else(|| "vesc/0".to_string());
    let topic = format!("{}/{}", prefix.trim_end_matches('/'), TOPIC_CMD);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(topic.clone()).await?;

    info!("Publishing to {}", topic);
    info!("Controls: Left/Right=jog, Up/Down=step, P=toggle PID, Space=release, Q=quit");

    enable_raw_mode()?;
    let result = run_jog(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_jog(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut step_idx: usize = 1;
    let mut target = 0.0;
    let mut use_pid = false;
    let mut released = true;

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Right if pressed => {
                        target = normalize_angle(target + STEPS[step_idx]);
                        released = false;
                        info!("Target: {:.1} deg", target);
                    }
                    KeyCode::Left if pressed => {
                        target = normalize_angle(target - STEPS[step_idx]);
                        released = false;
                        info!("Target: {:.1} deg", target);
                    }

                    KeyCode::Up if pressed => {
                        step_idx = (step_idx + 1).min(STEPS.len() - 1);
                        info!("Step: {} deg", STEPS[step_idx]);
                    }
                    KeyCode::Down if pressed => {
                        step_idx = step_idx.saturating_sub(1);
                        info!("Step: {} deg", STEPS[step_idx]);
                    }

                    KeyCode::Char('p') if pressed => {
                        use_pid = !use_pid;
                        info!("Mode: {}", if use_pid { "PID" } else { "driver position" });
                    }
                    KeyCode::Char(' ') if pressed => {
                        released = true;
                        info!("Released");
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        let cmd = if released {
            TargetCommand::Current { amps: 0.0 }
        } else if use_pid {
            TargetCommand::PidPosition { deg: target }
        } else {
            TargetCommand::Position { deg: target }
        };

        // Always publish at ~50Hz so the runtime watchdog stays fed
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    // Leave the motor released
    let stop = TargetCommand::Current { amps: 0.0 };
    publisher.put(serde_json::to_string(&stop)?).await?;

    Ok(())
}
