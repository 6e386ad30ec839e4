// flock_agent/src/transport/loopback.rs

use tokio::sync::{broadcast, mpsc};

use super::{Outbound, Transport, TransportError, POSES_CHANNEL};

/// The shared `poses` channel for agents running in one process.
///
/// Every subscriber sees every broadcast, its own included. Slow subscribers
/// lose the oldest messages rather than holding up the sender, the same
/// trade-off a lossy radio link makes.
#[derive(Debug, Clone)]
pub struct SwarmBus {
    poses: broadcast::Sender<String>,
}

impl SwarmBus {
    pub fn new(capacity: usize) -> Self {
        let (poses, _) = broadcast::channel(capacity);
        Self { poses }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.poses.subscribe()
    }

    /// Injects a broadcast as if a peer had sent it.
    pub fn broadcast(&self, text: impl Into<String>) {
        // No subscribers is not an error for a broadcast medium.
        let _ = self.poses.send(text.into());
    }
}

/// In-process transport: pose broadcasts go to the [`SwarmBus`], everything
/// published (broadcasts included) is also forwarded to a local outbox for the
/// actuation side and observers.
#[derive(Debug)]
pub struct LoopbackTransport {
    bus: Option<SwarmBus>,
    outbox: mpsc::UnboundedSender<Outbound>,
}

impl LoopbackTransport {
    pub fn new(bus: Option<SwarmBus>) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        (Self { bus, outbox }, rx)
    }
}

impl Transport for LoopbackTransport {
    fn publish(&mut self, message: Outbound) -> Result<(), TransportError> {
        if let (Outbound::Pose(text), Some(bus)) = (&message, &self.bus) {
            bus.broadcast(text.clone());
        }
        self.outbox
            .send(message)
            .map_err(|_| TransportError::Closed("outbox".to_string()))
    }
}
