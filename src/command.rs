use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use rover_kinematics::Twist;

use crate::blackboard::{Blackboard, set_twist};
use crate::bus::{BusError, CONTROL_TOPIC, MessageBus};

/// An inbound motion command from the control channel.
///
/// `MOVE` carries the commanded velocities; absent velocity fields default
/// to zero. `STOP` carries nothing and zeroes both velocities.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlCommand {
    #[serde(rename = "MOVE")]
    Move {
        #[serde(default)]
        linear: f64,
        #[serde(default)]
        angular: f64,
    },
    #[serde(rename = "STOP")]
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed control payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode(payload: &[u8]) -> Result<ControlCommand, DecodeError> {
    Ok(serde_json::from_slice(payload)?)
}

impl ControlCommand {
    /// Applies the command to the shared state (last-write-wins).
    pub fn apply(&self, bb: &Blackboard) {
        match *self {
            ControlCommand::Move { linear, angular } => {
                set_twist(bb, Twist::new(linear, angular));
                info!(linear, angular, "move command applied");
            }
            ControlCommand::Stop => {
                set_twist(bb, Twist::default());
                info!("emergency stop");
            }
        }
    }
}

/// Subscribes to the control channel and spawns the single consumer task
/// that applies commands to the blackboard.
///
/// The delivery context only decodes and forwards into a bounded channel;
/// it never touches robot state itself. Malformed payloads and overflow are
/// logged and dropped, never fatal.
pub fn spawn_ingest(
    bus: &dyn MessageBus,
    bb: Blackboard,
    queue_depth: usize,
) -> Result<JoinHandle<()>, BusError> {
    let (tx, mut rx) = mpsc::channel::<ControlCommand>(queue_depth);

    bus.subscribe(
        CONTROL_TOPIC,
        Box::new(move |payload| match decode(payload) {
            Ok(cmd) => {
                if tx.try_send(cmd).is_err() {
                    warn!("command channel full; dropping command");
                }
            }
            Err(e) => warn!(error = %e, "discarding malformed control payload"),
        }),
    )?;

    Ok(tokio::spawn(async move {
        info!("command ingest task started");
        while let Some(cmd) = rx.recv().await {
            cmd.apply(&bb);
        }
        info!("control channel closed; command ingest task stopping");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::snapshot;
    use crate::bus::InMemoryBus;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn decodes_move_with_velocities() {
        let cmd = decode(br#"{"type":"MOVE","linear":1.0,"angular":-0.5}"#).unwrap();
        assert_eq!(
            cmd,
            ControlCommand::Move {
                linear: 1.0,
                angular: -0.5
            }
        );
    }

    #[test]
    fn decodes_move_with_missing_velocities_as_zero() {
        let cmd = decode(br#"{"type":"MOVE"}"#).unwrap();
        assert_eq!(
            cmd,
            ControlCommand::Move {
                linear: 0.0,
                angular: 0.0
            }
        );
    }

    #[test]
    fn decodes_stop() {
        let cmd = decode(br#"{"type":"STOP"}"#).unwrap();
        assert_eq!(cmd, ControlCommand::Stop);
    }

    #[test]
    fn rejects_missing_type_field() {
        let err = decode(br#"{"linear":1.0}"#);
        assert!(matches!(err, Err(DecodeError::Json(_))));
    }

    #[test]
    fn rejects_unknown_type_and_garbage() {
        assert!(decode(br#"{"type":"FLY"}"#).is_err());
        assert!(decode(b"not json at all").is_err());
    }

    #[test]
    fn apply_is_last_write_wins() {
        let bb: Blackboard = Arc::default();
        ControlCommand::Move {
            linear: 1.0,
            angular: 2.0,
        }
        .apply(&bb);
        ControlCommand::Move {
            linear: -3.0,
            angular: 0.25,
        }
        .apply(&bb);
        assert_eq!(snapshot(&bb).twist, Twist::new(-3.0, 0.25));

        ControlCommand::Stop.apply(&bb);
        assert_eq!(snapshot(&bb).twist, Twist::default());
    }

    async fn wait_for_twist(bb: &Blackboard, expected: Twist) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if snapshot(bb).twist == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("twist never reached expected value");
    }

    #[tokio::test]
    async fn ingest_applies_commands_from_the_bus() {
        let bus = InMemoryBus::new().unwrap();
        let bb: Blackboard = Arc::default();
        let _task = spawn_ingest(&bus, Arc::clone(&bb), 16).unwrap();

        bus.publish(
            CONTROL_TOPIC,
            br#"{"type":"MOVE","linear":1.0,"angular":0.0}"#.to_vec(),
        )
        .unwrap();
        wait_for_twist(&bb, Twist::new(1.0, 0.0)).await;

        bus.publish(CONTROL_TOPIC, br#"{"type":"STOP"}"#.to_vec()).unwrap();
        wait_for_twist(&bb, Twist::default()).await;
    }

    #[tokio::test]
    async fn malformed_payload_leaves_state_unchanged() {
        let bus = InMemoryBus::new().unwrap();
        let bb: Blackboard = Arc::default();
        let _task = spawn_ingest(&bus, Arc::clone(&bb), 16).unwrap();

        bus.publish(
            CONTROL_TOPIC,
            br#"{"type":"MOVE","linear":2.0,"angular":0.5}"#.to_vec(),
        )
        .unwrap();
        wait_for_twist(&bb, Twist::new(2.0, 0.5)).await;

        // Missing "type" field: discarded, prior command stays applied.
        bus.publish(CONTROL_TOPIC, br#"{"linear":9.9}"#.to_vec()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(snapshot(&bb).twist, Twist::new(2.0, 0.5));
    }
}
