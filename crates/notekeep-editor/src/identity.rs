//! Draft identity tracker.
//!
//! A draft starts `Unassigned` and moves to `Assigned(id)` exactly once,
//! when the first create succeeds. There is no way back. The state lives in
//! a `watch` channel so readers always see the latest value and observers
//! can react to the transition.

use tokio::sync::watch;
use uuid::Uuid;

use notekeep_core::{Error, Result};

/// Identity state of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    Unassigned,
    Assigned(Uuid),
}

impl IdentityState {
    pub fn id(self) -> Option<Uuid> {
        match self {
            Self::Unassigned => None,
            Self::Assigned(id) => Some(id),
        }
    }
}

/// Holds the current identity of the note being edited.
#[derive(Debug)]
pub struct DraftIdentity {
    tx: watch::Sender<IdentityState>,
}

impl DraftIdentity {
    /// Tracker for a draft that has never been saved.
    pub fn unassigned() -> Self {
        Self::with_state(IdentityState::Unassigned)
    }

    /// Tracker for a draft opened from an existing note.
    pub fn assigned(id: Uuid) -> Self {
        Self::with_state(IdentityState::Assigned(id))
    }

    fn with_state(state: IdentityState) -> Self {
        let (tx, _) = watch::channel(state);
        Self { tx }
    }

    /// Latest state.
    pub fn state(&self) -> IdentityState {
        *self.tx.borrow()
    }

    /// Latest identity, if assigned.
    pub fn current(&self) -> Option<Uuid> {
        self.state().id()
    }

    pub fn is_assigned(&self) -> bool {
        self.current().is_some()
    }

    /// Adopt `id` as the draft's permanent identity.
    ///
    /// Returns `Ok(true)` on the `Unassigned → Assigned` transition and
    /// `Ok(false)` when the same id is already assigned. Assigning a
    /// different id is an invariant violation.
    pub fn assign(&self, id: Uuid) -> Result<bool> {
        let mut existing = None;
        let transitioned = self.tx.send_if_modified(|state| match *state {
            IdentityState::Unassigned => {
                *state = IdentityState::Assigned(id);
                true
            }
            IdentityState::Assigned(current) => {
                existing = Some(current);
                false
            }
        });

        match existing {
            Some(current) if current != id => Err(Error::Internal(format!(
                "draft already has identity {}, refusing {}",
                current, id
            ))),
            _ => Ok(transitioned),
        }
    }

    /// Observe identity changes.
    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.tx.subscribe()
    }
}
