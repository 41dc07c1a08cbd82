//! Payment approval state machine.
//!
//! A purchase moves `AwaitingProof -> Submitted -> {Approved, Rejected}`.
//! Both outcomes are terminal; a rejected buyer starts over from plan
//! selection. The transition function is pure so the flow can be tested
//! without any chat framework; the bot layer owns the side effects
//! (copying the screenshot, writing the ledger, sending the receipt).
//!
//! Only `AwaitingProof` needs process state (the buyer picked a plan but
//! has not sent the screenshot yet). `Submitted` lives entirely in the
//! admin message and its callback data. Pending approvals have no timeout
//! and no double-decision fence.

use dashmap::DashMap;
use thiserror::Error;

/// What the buyer is purchasing: a catalog plan or the all-in-one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseTarget {
    Plan(i64),
    Bundle,
}

impl PurchaseTarget {
    /// Compact form used inside callback data.
    pub fn encode(&self) -> String {
        match self {
            PurchaseTarget::Plan(id) => format!("p{}", id),
            PurchaseTarget::Bundle => "bundle".to_string(),
        }
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(s: &str) -> Option<Self> {
        if s == "bundle" {
            return Some(PurchaseTarget::Bundle);
        }
        s.strip_prefix('p').and_then(|id| id.parse().ok()).map(PurchaseTarget::Plan)
    }
}

/// States of one purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    /// Buyer saw the payment instructions, screenshot not yet received
    AwaitingProof,
    /// Screenshot forwarded to the admin, decision pending
    Submitted,
    /// Terminal: admin accepted, ledger row written
    Approved,
    /// Terminal: admin declined
    Rejected,
}

/// Events that drive a purchase attempt forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalEvent {
    SubmitProof,
    Approve,
    Reject,
}

/// Invalid transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("no proof has been submitted yet")]
    NotSubmitted,

    #[error("proof was already submitted")]
    AlreadySubmitted,

    #[error("purchase already settled")]
    AlreadySettled,
}

/// Pure transition function `(state, event) -> state'`.
pub fn advance(state: ApprovalState, event: ApprovalEvent) -> Result<ApprovalState, TransitionError> {
    use ApprovalEvent::*;
    use ApprovalState::*;

    match (state, event) {
        (AwaitingProof, SubmitProof) => Ok(Submitted),
        (AwaitingProof, Approve | Reject) => Err(TransitionError::NotSubmitted),
        (Submitted, SubmitProof) => Err(TransitionError::AlreadySubmitted),
        (Submitted, Approve) => Ok(Approved),
        (Submitted, Reject) => Ok(Rejected),
        (Approved | Rejected, _) => Err(TransitionError::AlreadySettled),
    }
}

/// In-memory purchase sessions, keyed by buyer id.
///
/// A session exists only while a buyer is in `AwaitingProof`. Submitting a
/// proof consumes the session; anything left over is dropped with the
/// process.
#[derive(Default)]
pub struct SessionStore {
    inner: DashMap<i64, PurchaseTarget>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `AwaitingProof` for a buyer. Re-selecting a plan simply
    /// replaces the previous target.
    pub fn begin(&self, user_id: i64, target: PurchaseTarget) {
        self.inner.insert(user_id, target);
    }

    /// Consume the session for a submitted proof. `None` means the session
    /// expired or never existed and the buyer must restart.
    pub fn take(&self, user_id: i64) -> Option<PurchaseTarget> {
        self.inner.remove(&user_id).map(|(_, target)| target)
    }

    /// Drop a session without submitting (buyer cancelled).
    pub fn cancel(&self, user_id: i64) -> bool {
        self.inner.remove(&user_id).is_some()
    }

    pub fn is_awaiting(&self, user_id: i64) -> bool {
        self.inner.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn happy_path_approve() {
        let s = advance(ApprovalState::AwaitingProof, ApprovalEvent::SubmitProof).unwrap();
        assert_eq!(s, ApprovalState::Submitted);
        let s = advance(s, ApprovalEvent::Approve).unwrap();
        assert_eq!(s, ApprovalState::Approved);
    }

    #[test]
    fn reject_is_terminal() {
        let s = advance(ApprovalState::Submitted, ApprovalEvent::Reject).unwrap();
        assert_eq!(s, ApprovalState::Rejected);
        assert_eq!(
            advance(s, ApprovalEvent::Approve),
            Err(TransitionError::AlreadySettled)
        );
        assert_eq!(
            advance(s, ApprovalEvent::SubmitProof),
            Err(TransitionError::AlreadySettled)
        );
    }

    #[test]
    fn cannot_decide_before_submission() {
        assert_eq!(
            advance(ApprovalState::AwaitingProof, ApprovalEvent::Approve),
            Err(TransitionError::NotSubmitted)
        );
    }

    #[test]
    fn double_submission_is_rejected() {
        assert_eq!(
            advance(ApprovalState::Submitted, ApprovalEvent::SubmitProof),
            Err(TransitionError::AlreadySubmitted)
        );
    }

    #[test]
    fn session_take_consumes() {
        let store = SessionStore::new();
        store.begin(7, PurchaseTarget::Plan(3));
        assert!(store.is_awaiting(7));
        assert_eq!(store.take(7), Some(PurchaseTarget::Plan(3)));
        // Second take: session expired, buyer must restart
        assert_eq!(store.take(7), None);
    }

    #[test]
    fn reselecting_replaces_target() {
        let store = SessionStore::new();
        store.begin(7, PurchaseTarget::Plan(3));
        store.begin(7, PurchaseTarget::Bundle);
        assert_eq!(store.take(7), Some(PurchaseTarget::Bundle));
    }

    #[test]
    fn target_encoding_round_trips() {
        for target in [PurchaseTarget::Plan(42), PurchaseTarget::Bundle] {
            assert_eq!(PurchaseTarget::decode(&target.encode()), Some(target));
        }
        assert_eq!(PurchaseTarget::decode("x9"), None);
    }
}
