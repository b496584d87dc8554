use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, mpsc};
use std::{io, thread};
use tracing::debug;

/// Periodic robot status samples (publish).
pub const STATUS_TOPIC: &str = "/robot/status";
/// Operator motion commands (subscribe).
pub const CONTROL_TOPIC: &str = "/robot/control";
/// Local connection descriptions (publish).
pub const PEER_OFFER_TOPIC: &str = "/robot/peer/offer";
/// Remote connection descriptions (subscribe).
pub const PEER_ANSWER_TOPIC: &str = "/robot/peer/answer";

/// Callback invoked on the transport's delivery context.
pub type MessageHandler = Box<dyn Fn(&[u8]) + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("transport delivery context is not running")]
    Closed,
}

/// Publish/subscribe transport seam.
///
/// Implementations must deliver messages for a single channel in publish
/// order, invoke handlers from a context distinct from the publisher's
/// scheduling loop, and have registration fully in effect when `subscribe`
/// returns.
pub trait MessageBus: Send + Sync {
    fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), BusError>;
    fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<(), BusError>;
    /// Human-readable transport name for logging.
    fn name(&self) -> &'static str;
}

type HandlerMap = HashMap<String, Vec<MessageHandler>>;

/// In-process bus backed by a single delivery thread.
///
/// One thread drains the publish queue and invokes every handler registered
/// for the message's channel, sequentially and without overlap, so handlers
/// see the same ordering and threading discipline a broker connection would
/// give them. Handlers may publish from inside a callback but must not
/// subscribe there (the registry lock is held during dispatch).
pub struct InMemoryBus {
    tx: mpsc::Sender<(String, Vec<u8>)>,
    handlers: Arc<Mutex<HandlerMap>>,
}

impl InMemoryBus {
    pub fn new() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<(String, Vec<u8>)>();
        let handlers: Arc<Mutex<HandlerMap>> = Arc::default();

        let dispatch = Arc::clone(&handlers);
        thread::Builder::new().name("bus-delivery".into()).spawn(move || {
            debug!("bus delivery thread started");
            while let Ok((channel, payload)) = rx.recv() {
                let map = dispatch.lock();
                match map.get(&channel) {
                    Some(subscribers) => {
                        for handler in subscribers {
                            handler(&payload);
                        }
                    }
                    None => debug!(%channel, "message on channel without subscribers"),
                }
            }
            debug!("bus delivery thread stopped");
        })?;

        Ok(InMemoryBus { tx, handlers })
    }
}

impl MessageBus for InMemoryBus {
    fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.tx
            .send((channel.to_string(), payload))
            .map_err(|_| BusError::Closed)
    }

    fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<(), BusError> {
        self.handlers
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
