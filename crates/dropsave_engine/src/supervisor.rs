use dropsave_core::{transition, SessionEvent, SessionState};
use engine_logging::engine_info;
use tokio::sync::mpsc;

use crate::poller::Poller;

/// Sender side of the session event stream.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub fn sign_in(&self) -> bool {
        self.send(SessionEvent::SignedIn)
    }

    pub fn sign_out(&self) -> bool {
        self.send(SessionEvent::SignedOut)
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionEvent::Shutdown)
    }

    /// Returns `false` once the supervisor has exited.
    fn send(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

pub fn session_channel() -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionHandle { tx }, rx)
}

/// Binds the poller's lifecycle to session transitions.
pub struct Supervisor {
    poller: Poller,
    state: SessionState,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Supervisor {
    pub fn new(poller: Poller, events: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self {
            poller,
            state: SessionState::SignedOut,
            events,
        }
    }

    /// Consumes session events until shutdown. Dropping every handle counts
    /// as shutdown. Polling is always stopped before this returns.
    pub async fn run(mut self) -> SessionState {
        while self.state != SessionState::Closed {
            let event = self.events.recv().await.unwrap_or(SessionEvent::Shutdown);
            self.handle(event).await;
        }
        self.poller.stop().await;
        self.state
    }

    async fn handle(&mut self, event: SessionEvent) {
        let (next, command) = transition(self.state, event);
        if next != self.state {
            engine_info!("Session {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        if let Some(command) = command {
            self.poller.apply(command).await;
        }
    }
}
