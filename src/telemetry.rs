use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time;
use tracing::{debug, info, warn};

use rover_kinematics::{PlanarDrive, PowerModel};

use crate::blackboard::{Blackboard, Mode};
use crate::bus::{MessageBus, STATUS_TOPIC};
use crate::config::SimConfig;

/// Status snapshot published on every tick. Field names follow the wire
/// format the operator side expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Remaining charge, truncated to a whole percent.
    pub battery_level: u8,
    /// Synthetic chassis temperature reading.
    pub temperature: f64,
    /// Always false here; charging is an external event.
    pub is_charging: bool,
    pub x: f64,
    pub y: f64,
    pub mode: Mode,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Baseline chassis temperature with a little sensor noise.
fn synth_temperature<R: Rng>(rng: &mut R) -> f64 {
    round1(36.5 + rng.random_range(-0.5..=0.5))
}

/// Advances the simulation by one tick and builds the sample to publish.
///
/// Position and battery are updated under a single write lock together with
/// the velocity read, so a concurrent command can never tear the update.
pub fn tick(
    bb: &Blackboard,
    drive: &PlanarDrive,
    power: &PowerModel,
    temperature: f64,
) -> TelemetrySample {
    let mut st = bb.write();
    st.position = drive.step(st.position, st.twist);
    st.battery_level = power.drain(st.battery_level, st.twist);
    TelemetrySample {
        battery_level: st.battery_level as u8,
        temperature,
        is_charging: false,
        x: round2(st.position.x),
        y: round2(st.position.y),
        mode: st.mode,
    }
}

/// Fixed-interval telemetry loop. Runs until process shutdown.
pub async fn telemetry_task(
    bb: Blackboard,
    bus: Arc<dyn MessageBus>,
    cfg: SimConfig,
) -> anyhow::Result<()> {
    let drive = cfg.drive()?;
    let power = cfg.power()?;
    let mut ticker = time::interval(cfg.tick_interval());
    let mut rng = StdRng::from_os_rng();
    info!(interval_ms = cfg.tick_interval_ms, "telemetry task started");

    loop {
        ticker.tick().await;
        let temperature = synth_temperature(&mut rng);
        let sample = tick(&bb, &drive, &power, temperature);
        match serde_json::to_vec(&sample) {
            Ok(payload) => {
                if let Err(e) = bus.publish(STATUS_TOPIC, payload) {
                    warn!(error = %e, "failed to publish telemetry");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode telemetry"),
        }
        debug!(
            battery = sample.battery_level,
            x = sample.x,
            y = sample.y,
            "telemetry tick"
        );
    }
}
