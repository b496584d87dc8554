use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use rover_kinematics::Twist;

use crate::bus::{BusError, MessageBus, PEER_ANSWER_TOPIC, PEER_OFFER_TOPIC};
use crate::peer::PeerConnection;
use crate::video::{FrameProducer, VideoFrame};

/// A connection description exchanged over the signaling channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("malformed session description payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("remote description rejected: {0}")]
    Rejected(&'static str),
    #[error("timed out after {0:?} waiting for an answer")]
    AnswerTimeout(Duration),
    #[error("answer slot closed before an answer arrived")]
    ChannelClosed,
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Single-slot rendezvous carrying the remote answer from the transport's
/// delivery context into the waiting coordinator.
///
/// The slot is fulfilled at most once; later deposits are logged and
/// dropped, as is a deposit arriving after the session stopped waiting.
pub struct AnswerSlot {
    tx: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
}

impl AnswerSlot {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<Vec<u8>>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(AnswerSlot {
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    pub fn deposit(&self, payload: Vec<u8>) {
        let Some(tx) = self.tx.lock().take() else {
            warn!("answer slot already fulfilled; dropping extra answer");
            return;
        };
        if tx.send(payload).is_err() {
            warn!("answer arrived after the session stopped waiting; dropped");
        }
    }
}

/// Phases of one offer/answer negotiation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Init,
    OfferSent,
    AwaitingAnswer,
    Negotiated,
    Connected,
    Failed,
}

/// One negotiation attempt over the signaling channels.
///
/// The session exclusively owns its peer connection; the transport's
/// delivery context only ever touches the answer slot. A failed session
/// closes the connection and stays `Failed` — retrying means building a
/// fresh session.
pub struct HandshakeSession {
    id: Uuid,
    state: HandshakeState,
    pc: Box<dyn PeerConnection>,
}

impl HandshakeSession {
    /// Builds a session in `Init` with the frame producer attached as the
    /// outbound media source.
    pub fn new(mut pc: Box<dyn PeerConnection>, producer: Box<dyn FrameProducer>) -> Self {
        pc.attach_producer(producer);
        HandshakeSession {
            id: Uuid::new_v4(),
            state: HandshakeState::Init,
            pc,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Pulls the next outbound frame from the negotiated connection.
    pub fn poll_frame(&mut self, twist: Twist) -> Option<VideoFrame> {
        self.pc.produce_frame(twist)
    }

    /// Drives the session from `Init` to `Connected`, or to `Failed`.
    ///
    /// The answer subscription is registered before the offer is published,
    /// so an answer arriving immediately after the offer cannot be missed.
    /// Waiting for the answer is bounded by `answer_timeout`; a lost answer
    /// fails the session instead of suspending it forever.
    pub async fn run(
        &mut self,
        bus: &dyn MessageBus,
        answer_timeout: Duration,
    ) -> Result<(), NegotiationError> {
        let (slot, answer_rx) = AnswerSlot::new();
        {
            let slot = Arc::clone(&slot);
            if let Err(e) = bus.subscribe(
                PEER_ANSWER_TOPIC,
                Box::new(move |payload| slot.deposit(payload.to_vec())),
            ) {
                return Err(self.fail(e.into()));
            }
        }

        let offer = match self.pc.create_offer() {
            Ok(offer) => offer,
            Err(e) => return Err(self.fail(e)),
        };
        let payload = match serde_json::to_vec(&offer) {
            Ok(payload) => payload,
            Err(e) => return Err(self.fail(e.into())),
        };
        if let Err(e) = bus.publish(PEER_OFFER_TOPIC, payload) {
            return Err(self.fail(e.into()));
        }
        self.state = HandshakeState::OfferSent;
        info!(session = %self.id, "offer published");

        self.state = HandshakeState::AwaitingAnswer;
        let raw = match tokio::time::timeout(answer_timeout, answer_rx).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(_)) => return Err(self.fail(NegotiationError::ChannelClosed)),
            Err(_) => return Err(self.fail(NegotiationError::AnswerTimeout(answer_timeout))),
        };

        let answer: SessionDescription = match serde_json::from_slice(&raw) {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.state = HandshakeState::Negotiated;

        if let Err(e) = self.pc.set_remote_description(answer) {
            return Err(self.fail(e));
        }
        self.state = HandshakeState::Connected;
        info!(session = %self.id, "peer connection established");
        Ok(())
    }

    /// Terminal failure: close the connection so nothing stays half-open.
    fn fail(&mut self, err: NegotiationError) -> NegotiationError {
        warn!(session = %self.id, error = %err, "handshake failed");
        self.pc.close();
        self.state = HandshakeState::Failed;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use crate::peer::{ConnectionProbe, SimPeerConnection};
    use crate::video::BouncingBall;

    fn session() -> (HandshakeSession, ConnectionProbe) {
        let pc = SimPeerConnection::new();
        let probe = pc.probe();
        let session = HandshakeSession::new(Box::new(pc), Box::new(BouncingBall::new(64, 48)));
        (session, probe)
    }

    /// Answers every offer on the bus with the given payload, the way an
    /// operator console would.
    fn spawn_answerer(bus: &Arc<InMemoryBus>, answer_payload: &'static [u8]) {
        let publisher = Arc::clone(bus);
        bus.subscribe(
            PEER_OFFER_TOPIC,
            Box::new(move |_offer| {
                publisher
                    .publish(PEER_ANSWER_TOPIC, answer_payload.to_vec())
                    .unwrap();
            }),
        )
        .unwrap();
    }

    #[test]
    fn answer_slot_delivers_first_deposit_only() {
        let (slot, rx) = AnswerSlot::new();
        slot.deposit(b"first".to_vec());
        slot.deposit(b"second".to_vec());
        assert_eq!(rx.blocking_recv().unwrap(), b"first".to_vec());
    }

    #[test]
    fn answer_slot_tolerates_deposit_after_receiver_dropped() {
        let (slot, rx) = AnswerSlot::new();
        drop(rx);
        slot.deposit(b"late".to_vec());
    }

    #[tokio::test]
    async fn handshake_reaches_connected_on_well_formed_answer() {
        let bus = Arc::new(InMemoryBus::new().unwrap());
        spawn_answerer(&bus, br#"{"sdp":"v=0\r\ns=console\r\n","type":"answer"}"#);

        let (mut session, probe) = session();
        assert_eq!(session.state(), HandshakeState::Init);
        session.run(bus.as_ref(), Duration::from_secs(2)).await.unwrap();
        assert_eq!(session.state(), HandshakeState::Connected);
        assert!(probe.is_open());

        // Media flows once negotiated.
        assert!(session.poll_frame(Twist::new(1.0, 0.0)).is_some());
    }

    #[tokio::test]
    async fn malformed_answer_fails_without_leaving_half_open() {
        let bus = Arc::new(InMemoryBus::new().unwrap());
        spawn_answerer(&bus, br#"{"sdp":"v=0"}"#); // missing "type"

        let (mut session, probe) = session();
        let err = session
            .run(bus.as_ref(), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Decode(_)));
        assert_eq!(session.state(), HandshakeState::Failed);
        assert!(!probe.is_open());
        assert!(session.poll_frame(Twist::default()).is_none());
    }

    #[tokio::test]
    async fn rejected_answer_fails_the_session() {
        let bus = Arc::new(InMemoryBus::new().unwrap());
        // Well-formed JSON, but the description type is wrong.
        spawn_answerer(&bus, br#"{"sdp":"v=0","type":"offer"}"#);

        let (mut session, probe) = session();
        let err = session
            .run(bus.as_ref(), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Rejected(_)));
        assert_eq!(session.state(), HandshakeState::Failed);
        assert!(!probe.is_open());
    }

    #[tokio::test]
    async fn missing_answer_times_out_instead_of_hanging() {
        let bus = Arc::new(InMemoryBus::new().unwrap());
        // Nobody subscribed to offers, so no answer ever arrives.
        let (mut session, probe) = session();
        let err = session
            .run(bus.as_ref(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::AnswerTimeout(_)));
        assert_eq!(session.state(), HandshakeState::Failed);
        assert!(!probe.is_open());
    }

    #[tokio::test]
    async fn duplicate_answers_keep_the_first() {
        let bus = Arc::new(InMemoryBus::new().unwrap());
        let publisher = Arc::clone(&bus);
        bus.subscribe(
            PEER_OFFER_TOPIC,
            Box::new(move |_offer| {
                publisher
                    .publish(
                        PEER_ANSWER_TOPIC,
                        br#"{"sdp":"first","type":"answer"}"#.to_vec(),
                    )
                    .unwrap();
                publisher
                    .publish(
                        PEER_ANSWER_TOPIC,
                        br#"{"sdp":"second","type":"answer"}"#.to_vec(),
                    )
                    .unwrap();
            }),
        )
        .unwrap();

        let (mut session, probe) = session();
        session.run(bus.as_ref(), Duration::from_secs(2)).await.unwrap();
        assert_eq!(session.state(), HandshakeState::Connected);
        assert_eq!(probe.remote_description().unwrap().sdp, "first");
    }

    #[tokio::test]
    async fn control_traffic_never_reaches_the_answer_slot() {
        let bus = Arc::new(InMemoryBus::new().unwrap());
        let publisher = Arc::clone(&bus);
        bus.subscribe(
            PEER_OFFER_TOPIC,
            Box::new(move |_offer| {
                // A command lands first; routing must keep it away from the
                // answer slot, and the real answer still gets through.
                publisher
                    .publish(
                        crate::bus::CONTROL_TOPIC,
                        br#"{"type":"STOP"}"#.to_vec(),
                    )
                    .unwrap();
                publisher
                    .publish(
                        PEER_ANSWER_TOPIC,
                        br#"{"sdp":"v=0","type":"answer"}"#.to_vec(),
                    )
                    .unwrap();
            }),
        )
        .unwrap();

        let (mut session, _probe) = session();
        session.run(bus.as_ref(), Duration::from_secs(2)).await.unwrap();
        assert_eq!(session.state(), HandshakeState::Connected);
    }
}
