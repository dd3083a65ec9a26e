//! Endpoint lifecycle.
//!
//! ```text
//! Unconfigured -> BaselineProbing -> Ready -> Terminated
//!                       |              |
//!                       +--> Aborted <-+
//! ```

use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Unconfigured,
    BaselineProbing,
    Ready,
    Terminated,
    Aborted,
}

impl EndpointState {
    pub fn can_transition_to(self, next: EndpointState) -> bool {
        use EndpointState::*;

        matches!(
            (self, next),
            (Unconfigured, BaselineProbing)
                | (BaselineProbing, Ready)
                | (BaselineProbing, Aborted)
                | (Ready, Terminated)
                | (Ready, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EndpointState::Terminated | EndpointState::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointState::Unconfigured => "unconfigured",
            EndpointState::BaselineProbing => "probing",
            EndpointState::Ready => "ready",
            EndpointState::Terminated => "terminated",
            EndpointState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs the state of one endpoint.
#[derive(Debug)]
pub struct Lifecycle {
    provider: String,
    endpoint: SocketAddr,
    state: EndpointState,
}

impl Lifecycle {
    pub fn new(provider: impl Into<String>, endpoint: SocketAddr) -> Self {
        Self {
            provider: provider.into(),
            endpoint,
            state: EndpointState::Unconfigured,
        }
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Move to `next`. Illegal transitions are ignored and return false.
    pub fn advance(&mut self, next: EndpointState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                provider = %self.provider,
                endpoint = %self.endpoint,
                from = %self.state,
                to = %next,
                "illegal endpoint state transition"
            );
            return false;
        }

        tracing::debug!(
            provider = %self.provider,
            endpoint = %self.endpoint,
            from = %self.state,
            to = %next,
            "endpoint state"
        );
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointState::*;
    use super::*;

    const ALL: [EndpointState; 5] = [Unconfigured, BaselineProbing, Ready, Terminated, Aborted];

    #[test]
    fn terminal_states_have_no_exits() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn happy_path() {
        let mut lifecycle = Lifecycle::new("honest", "8.8.8.8:53".parse().unwrap());
        assert!(lifecycle.advance(BaselineProbing));
        assert!(lifecycle.advance(Ready));
        assert!(lifecycle.advance(Terminated));
        assert_eq!(lifecycle.state(), Terminated);
    }

    #[test]
    fn probing_can_abort() {
        let mut lifecycle = Lifecycle::new("bt", "81.139.56.100:53".parse().unwrap());
        assert!(lifecycle.advance(BaselineProbing));
        assert!(lifecycle.advance(Aborted));
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn cannot_skip_probing() {
        let mut lifecycle = Lifecycle::new("bt", "81.139.56.100:53".parse().unwrap());
        assert!(!lifecycle.advance(Ready));
        assert_eq!(lifecycle.state(), Unconfigured);
    }
}
