//! Optimistic boolean-plus-counter toggles (likes, follows).
//!
//! A toggle flips locally before its mutation is submitted and returns to the
//! captured values if the mutation fails:
//!
//! ```text
//! Idle ──begin──▶ Pending ──commit──▶ Committed
//!                    │
//!                    └──revert──▶ Reverted
//! ```
//!
//! While `Pending`, further `begin` calls are refused, so one control never
//! has two mutations in flight.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use crate::errors::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TogglePhase {
    #[default]
    Idle,
    Pending,
    Committed,
    Reverted,
}

/// Values captured by [`OptimisticToggle::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleSnapshot {
    pub active: bool,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptimisticToggle {
    active: bool,
    count: u64,
    phase: TogglePhase,
}

impl OptimisticToggle {
    pub fn new(active: bool, count: u64) -> Self {
        Self {
            active,
            count,
            phase: TogglePhase::Idle,
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn phase(&self) -> TogglePhase {
        self.phase
    }

    /// Adopt freshly loaded values. A pending toggle keeps its optimistic
    /// state; its mutation settles it.
    pub fn reload(&mut self, active: bool, count: u64) {
        if !self.is_pending() {
            *self = Self::new(active, count);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.phase == TogglePhase::Pending
    }

    /// Flip the flag and adjust the counter. Returns `None` while a previous
    /// toggle is still pending.
    pub fn begin(&mut self) -> Option<ToggleSnapshot> {
        if self.is_pending() {
            return None;
        }
        let snapshot = ToggleSnapshot {
            active: self.active,
            count: self.count,
        };
        self.active = !self.active;
        self.count = if self.active {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        self.phase = TogglePhase::Pending;
        Some(snapshot)
    }

    pub fn commit(&mut self) {
        self.phase = TogglePhase::Committed;
    }

    /// Restore the exact values captured by `begin`.
    pub fn revert(&mut self, snapshot: ToggleSnapshot) {
        self.active = snapshot.active;
        self.count = snapshot.count;
        self.phase = TogglePhase::Reverted;
    }
}

#[derive(Debug)]
pub enum ToggleOutcome {
    Committed,
    Reverted(DataError),
    /// A toggle on the same control was already in flight.
    Ignored,
}

impl ToggleOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ToggleOutcome::Committed)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, ToggleOutcome::Ignored)
    }

    pub fn error(&self) -> Option<&DataError> {
        match self {
            ToggleOutcome::Reverted(err) => Some(err),
            _ => None,
        }
    }
}

/// Run one optimistic toggle living inside `state`.
///
/// `access` locates the toggle; `submit` receives the new `active` value and
/// performs the mutation. The lock is released while `submit` runs.
pub async fn drive<S, A, F, Fut>(state: &Mutex<S>, access: A, submit: F) -> ToggleOutcome
where
    A: Fn(&mut S) -> Option<&mut OptimisticToggle>,
    F: FnOnce(bool) -> Fut,
    Fut: Future<Output = Result<(), DataError>>,
{
    let begun = {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        access(&mut *guard).and_then(|toggle| toggle.begin().map(|snapshot| (snapshot, toggle.active())))
    };
    let Some((snapshot, target)) = begun else {
        return ToggleOutcome::Ignored;
    };

    let result = submit(target).await;

    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    let toggle = access(&mut *guard);
    match (result, toggle) {
        (Ok(()), Some(toggle)) => {
            toggle.commit();
            ToggleOutcome::Committed
        }
        (Ok(()), None) => ToggleOutcome::Committed,
        (Err(err), Some(toggle)) => {
            toggle.revert(snapshot);
            ToggleOutcome::Reverted(err)
        }
        (Err(err), None) => ToggleOutcome::Reverted(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_leaves_a_pending_toggle_alone() {
        let mut toggle = OptimisticToggle::new(false, 2);
        toggle.reload(true, 7);
        assert_eq!((toggle.active(), toggle.count()), (true, 7));

        let snapshot = toggle.begin().expect("idle toggle begins");
        toggle.reload(true, 7);
        assert!(toggle.is_pending());
        assert_eq!((toggle.active(), toggle.count()), (false, 6));
        assert!(toggle.begin().is_none());

        toggle.revert(snapshot);
        assert_eq!((toggle.active(), toggle.count()), (true, 7));
    }

    #[test]
    fn begin_flips_and_counts() {
        let mut toggle = OptimisticToggle::new(false, 4);
        let snapshot = toggle.begin().expect("idle toggle begins");
        assert_eq!(snapshot, ToggleSnapshot { active: false, count: 4 });
        assert!(toggle.active());
        assert_eq!(toggle.count(), 5);
        assert_eq!(toggle.phase(), TogglePhase::Pending);
    }

    #[test]
    fn pending_toggle_refuses_reentry() {
        let mut toggle = OptimisticToggle::new(true, 1);
        assert!(toggle.begin().is_some());
        assert!(toggle.begin().is_none());
        assert!(!toggle.active());
        assert_eq!(toggle.count(), 0);
    }

    #[test]
    fn revert_restores_exact_values() {
        let mut toggle = OptimisticToggle::new(true, 0);
        let snapshot = toggle.begin().expect("begin");
        assert_eq!(toggle.count(), 0);
        toggle.revert(snapshot);
        assert!(toggle.active());
        assert_eq!(toggle.count(), 0);
        assert_eq!(toggle.phase(), TogglePhase::Reverted);
        assert!(toggle.begin().is_some());
    }

    #[tokio::test]
    async fn drive_commits_or_reverts() {
        let state = Mutex::new(OptimisticToggle::new(false, 2));
        let outcome = drive(&state, |t| Some(t), |active| async move {
            assert!(active);
            Ok(())
        })
        .await;
        assert!(outcome.is_committed());
        assert_eq!(state.lock().map(|t| (t.active(), t.count())).ok(), Some((true, 3)));

        let outcome = drive(&state, |t| Some(t), |_| async { Err(DataError::Unauthenticated) }).await;
        assert!(matches!(outcome, ToggleOutcome::Reverted(DataError::Unauthenticated)));
        assert_eq!(state.lock().map(|t| (t.active(), t.count())).ok(), Some((true, 3)));
    }
}
