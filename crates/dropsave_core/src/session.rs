#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    SignedOut,
    SignedIn,
    /// The tracking view was torn down; no further transitions.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    Start,
    Stop,
}

/// Pure session transition: applies an event and returns the poll command it implies.
///
/// A command is emitted only on a real edge, so every `Start` is matched by
/// exactly one `Stop`.
pub fn transition(state: SessionState, event: SessionEvent) -> (SessionState, Option<PollCommand>) {
    match (state, event) {
        (SessionState::Closed, _) => (SessionState::Closed, None),
        (SessionState::SignedOut, SessionEvent::SignedIn) => {
            (SessionState::SignedIn, Some(PollCommand::Start))
        }
        (SessionState::SignedIn, SessionEvent::SignedOut) => {
            (SessionState::SignedOut, Some(PollCommand::Stop))
        }
        (SessionState::SignedIn, SessionEvent::Shutdown) => {
            (SessionState::Closed, Some(PollCommand::Stop))
        }
        (SessionState::SignedOut, SessionEvent::Shutdown) => (SessionState::Closed, None),
        (state, SessionEvent::SignedIn | SessionEvent::SignedOut) => (state, None),
    }
}
