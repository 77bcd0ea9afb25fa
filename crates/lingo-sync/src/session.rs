use thiserror::Error;

/// Session lifecycle. Only `Active` runs store merge logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    Loading,
    Active,
}

/// A transition was requested from a state that does not allow it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot run '{action}' while session is {current:?}")]
pub struct InvalidTransition {
    pub current: SessionState,
    pub action: &'static str,
}

/// Tracks the `SignedOut -> Loading -> Active` lifecycle driven by the
/// external auth collaborator.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            state: SessionState::SignedOut,
        }
    }
}

impl SessionStateMachine {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Auth collaborator started resolving an identity.
    pub fn begin_loading(&mut self) -> Result<(), InvalidTransition> {
        self.transition_from(SessionState::SignedOut, SessionState::Loading, "begin_loading")
    }

    /// An identity arrived; the synchronization logic may start.
    pub fn activate(&mut self) -> Result<(), InvalidTransition> {
        self.transition_from(SessionState::Loading, SessionState::Active, "activate")
    }

    /// The identity went away. Legal from `Loading` (auth failed or
    /// was abandoned) and from `Active` (user signed out).
    pub fn sign_out(&mut self) -> Result<(), InvalidTransition> {
        match self.state {
            SessionState::Loading | SessionState::Active => {
                self.state = SessionState::SignedOut;
                Ok(())
            }
            current => Err(InvalidTransition {
                current,
                action: "sign_out",
            }),
        }
    }

    fn transition_from(
        &mut self,
        expected: SessionState,
        next: SessionState,
        action: &'static str,
    ) -> Result<(), InvalidTransition> {
        if self.state != expected {
            return Err(InvalidTransition {
                current: self.state,
                action,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_happy_path_transitions() {
        let mut session = SessionStateMachine::default();
        assert_eq!(session.state(), SessionState::SignedOut);

        session.begin_loading().expect("loading must work");
        assert_eq!(session.state(), SessionState::Loading);

        session.activate().expect("activate must work");
        assert!(session.is_active());

        session.sign_out().expect("sign out must work");
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[test]
    fn rejects_activation_without_loading() {
        let mut session = SessionStateMachine::default();
        let err = session
            .activate()
            .expect_err("activate straight from SignedOut must fail");
        assert_eq!(err.current, SessionState::SignedOut);
        assert_eq!(err.action, "activate");
    }

    #[test]
    fn allows_sign_out_from_loading() {
        let mut session = SessionStateMachine::default();
        session.begin_loading().expect("loading must work");
        session.sign_out().expect("abandoned auth must sign out");
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[test]
    fn rejects_double_sign_out() {
        let mut session = SessionStateMachine::default();
        assert!(session.sign_out().is_err());
    }
}
