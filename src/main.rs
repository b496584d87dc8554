mod blackboard;
mod bus;
mod command;
mod config;
mod peer;
mod signaling;
mod telemetry;
mod video;

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, trace};
use tracing_subscriber::{self, EnvFilter};

use blackboard::{Blackboard, RobotState, snapshot};
use bus::{InMemoryBus, MessageBus};
use crate::config::SimConfig;
use peer::SimPeerConnection;
use signaling::HandshakeSession;
use video::BouncingBall;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Rover simulator starting...");

    let cfg = config::load_config()?;
    let bb: Blackboard = Arc::new(RwLock::new(RobotState::new(
        cfg.start_position(),
        cfg.start_battery,
        cfg.mode,
    )));
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new()?);
    info!(transport = bus.name(), "transport ready");

    let _ingest = command::spawn_ingest(bus.as_ref(), Arc::clone(&bb), cfg.command_queue_depth)?;

    // A handshake failure is terminal for the video session only; telemetry
    // and command ingestion keep running.
    tokio::spawn({
        let bus = Arc::clone(&bus);
        let bb = Arc::clone(&bb);
        let cfg = cfg.clone();
        async move {
            if let Err(e) = video_session(bus, bb, cfg).await {
                error!(error = %e, "video session ended; restart is an operator decision");
            }
        }
    });

    telemetry::telemetry_task(bb, bus, cfg).await
}

/// Negotiates the video connection, then keeps pulling annotated frames
/// while it stays open.
async fn video_session(
    bus: Arc<dyn MessageBus>,
    bb: Blackboard,
    cfg: SimConfig,
) -> Result<(), signaling::NegotiationError> {
    let mut session = HandshakeSession::new(
        Box::new(SimPeerConnection::new()),
        Box::new(BouncingBall::default()),
    );
    info!(session = %session.id(), "starting video handshake");
    session.run(bus.as_ref(), cfg.answer_timeout()).await?;

    // Keepalive is the transport's concern; all that is left to do here is
    // feed the outbound track.
    let mut ticker = time::interval(Duration::from_millis(100));
    loop {
        ticker.tick().await;
        let twist = snapshot(&bb).twist;
        if let Some(frame) = session.poll_frame(twist) {
            trace!(pts = frame.pts, "video frame produced");
        }
    }
}
