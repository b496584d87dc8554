use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

use rover_kinematics::Twist;

use crate::signaling::{NegotiationError, SessionDescription};
use crate::video::{FrameProducer, VideoFrame};

/// The media connection collaborator negotiated by the handshake.
///
/// The coordinator drives this seam through the offer/answer exchange and
/// attaches the outbound frame producer; the connection's internals (real
/// media plumbing, ICE, keepalive) are not this crate's concern.
pub trait PeerConnection: Send {
    fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError>;
    fn set_remote_description(&mut self, answer: SessionDescription)
    -> Result<(), NegotiationError>;
    fn attach_producer(&mut self, producer: Box<dyn FrameProducer>);
    /// Pulls the next outbound frame; `None` until the connection is
    /// negotiated (or after it is closed).
    fn produce_frame(&mut self, twist: Twist) -> Option<VideoFrame>;
    fn close(&mut self);
}

/// Simulated peer connection: synthesises an SDP offer, validates the
/// remote answer, and feeds attached frames once negotiated.
pub struct SimPeerConnection {
    id: Uuid,
    producer: Option<Box<dyn FrameProducer>>,
    local: Option<SessionDescription>,
    open: Arc<AtomicBool>,
    remote: Arc<Mutex<Option<SessionDescription>>>,
}

/// Read-only view of a [`SimPeerConnection`]'s negotiated state, usable
/// after the connection has been handed to a session.
#[derive(Clone)]
pub struct ConnectionProbe {
    open: Arc<AtomicBool>,
    remote: Arc<Mutex<Option<SessionDescription>>>,
}

impl ConnectionProbe {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }
}

impl SimPeerConnection {
    pub fn new() -> Self {
        SimPeerConnection {
            id: Uuid::new_v4(),
            producer: None,
            local: None,
            open: Arc::new(AtomicBool::new(true)),
            remote: Arc::default(),
        }
    }

    pub fn probe(&self) -> ConnectionProbe {
        ConnectionProbe {
            open: Arc::clone(&self.open),
            remote: Arc::clone(&self.remote),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Default for SimPeerConnection {
    fn default() -> Self {
        SimPeerConnection::new()
    }
}

impl PeerConnection for SimPeerConnection {
    fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        if !self.is_open() {
            return Err(NegotiationError::Rejected("connection is closed"));
        }
        let offer = SessionDescription {
            sdp: format!(
                "v=0\r\no=rover {} 0 IN IP4 0.0.0.0\r\ns=rover-sim video\r\nm=video 9 RTP/AVP 96\r\n",
                self.id.simple()
            ),
            kind: "offer".into(),
        };
        self.local = Some(offer.clone());
        debug!(connection = %self.id, "local offer created");
        Ok(offer)
    }

    fn set_remote_description(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        if !self.is_open() {
            return Err(NegotiationError::Rejected("connection is closed"));
        }
        if self.local.is_none() {
            return Err(NegotiationError::Rejected("no pending local offer"));
        }
        if answer.kind != "answer" {
            return Err(NegotiationError::Rejected("description type must be \"answer\""));
        }
        if answer.sdp.trim().is_empty() {
            return Err(NegotiationError::Rejected("answer carries an empty sdp"));
        }
        debug!(connection = %self.id, "remote description applied");
        *self.remote.lock() = Some(answer);
        Ok(())
    }

    fn attach_producer(&mut self, producer: Box<dyn FrameProducer>) {
        self.producer = Some(producer);
    }

    fn produce_frame(&mut self, twist: Twist) -> Option<VideoFrame> {
        if !self.is_open() || self.remote.lock().is_none() {
            return None;
        }
        self.producer.as_mut().map(|p| p.next_frame(twist))
    }

    fn close(&mut self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!(connection = %self.id, "peer connection closed");
        }
        self.producer = None;
        *self.remote.lock() = None;
    }
}
