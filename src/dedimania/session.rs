use crate::dedimania::CallError;

/// The state of the session with the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No session, and no attempt to open one.
    Closed,

    /// Waiting for the reply to the given attempt to open a session.
    Opening { attempt: u32 },

    /// Calls can be made with the given session ID.
    Open { session_id: String },
}

/// The request to post at a liveness tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickAction {
    Open { attempt: u32 },
    Check { session_id: String },
}

/// Keeps track of the session with the ranking service.
///
/// Sessions are only ever opened at liveness ticks. A session that is
/// found to be invalid is closed right away, and is reopened at the next tick.
#[derive(Debug)]
pub struct SessionManager {
    state: SessionState,
    prev_attempt: u32,
}

impl Default for SessionManager {
    fn default() -> Self {
        SessionManager::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            state: SessionState::Closed,
            prev_attempt: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The ID of the open session, if any.
    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Open { session_id } => Some(session_id),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session_id().is_some()
    }

    /// Decide whether to open a new session, or to check the current one.
    pub fn on_tick(&mut self) -> TickAction {
        match &self.state {
            SessionState::Open { session_id } => TickAction::Check {
                session_id: session_id.clone(),
            },
            SessionState::Opening { attempt } => {
                // Requests time out before the next tick.
                log::warn!("no reply to session attempt #{}", attempt);
                self.next_attempt()
            }
            SessionState::Closed => self.next_attempt(),
        }
    }

    fn next_attempt(&mut self) -> TickAction {
        self.prev_attempt = self.prev_attempt.wrapping_add(1);
        let attempt = self.prev_attempt;
        log::debug!("open session, attempt #{}", attempt);
        self.state = SessionState::Opening { attempt };
        TickAction::Open { attempt }
    }

    /// Handle the reply to an attempt to open a session.
    ///
    /// Returns `true` if the session is now open.
    pub fn on_opened(&mut self, attempt: u32, result: Result<String, CallError>) -> bool {
        if self.state != (SessionState::Opening { attempt }) {
            log::debug!("ignore reply to stale session attempt #{}", attempt);
            return false;
        }
        match result {
            Ok(session_id) => {
                log::info!("opened ranking service session");
                self.state = SessionState::Open { session_id };
                true
            }
            Err(err) => {
                log::error!("failed to open ranking service session: {}", err);
                self.state = SessionState::Closed;
                false
            }
        }
    }

    /// Handle the reply to a session check that was sent for the given session.
    pub fn on_checked(&mut self, session_id: &str, result: Result<bool, CallError>) {
        match result {
            Ok(true) => log::debug!("session is alive"),
            Ok(false) => {
                log::warn!("ranking service session expired");
                self.invalidate(session_id);
            }
            Err(err) => {
                log::warn!("failed to check ranking service session: {}", err);
                self.invalidate(session_id);
            }
        }
    }

    /// Close the given session, unless it was already replaced.
    pub fn invalidate(&mut self, session_id: &str) {
        if self.session_id() == Some(session_id) {
            log::info!("closed ranking service session");
            self.state = SessionState::Closed;
        }
    }
}
