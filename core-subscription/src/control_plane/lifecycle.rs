//! Atomic lifecycle state machine of a subscription.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Observable lifecycle state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Created and configurable, never started.
    Idle = 0,
    /// Registered with the client and delivering.
    Active = 1,
    /// Cancellation requested; configurable and restartable.
    Cancelled = 2,
    /// Terminal.
    Disposed = 3,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Idle,
            1 => LifecycleState::Active,
            2 => LifecycleState::Cancelled,
            _ => LifecycleState::Disposed,
        }
    }

    /// States in which configuration may still change and `start` is allowed.
    pub fn is_configurable(self) -> bool {
        matches!(self, LifecycleState::Idle | LifecycleState::Cancelled)
    }
}

/// One atomic cell holding the lifecycle state.
///
/// Every transition is a single compare-and-swap or swap, so concurrent
/// start/cancel/dispose calls cannot lose an update.
pub(crate) struct Lifecycle {
    state: AtomicU8,
    activations: AtomicU64,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Idle as u8),
            activations: AtomicU64::new(0),
        }
    }

    pub(crate) fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.load() == LifecycleState::Active
    }

    /// Idle/Cancelled -> Active. Returns the state that was replaced, or the
    /// current state when the transition is not allowed.
    pub(crate) fn try_activate(&self) -> Result<LifecycleState, LifecycleState> {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                LifecycleState::from_u8(current)
                    .is_configurable()
                    .then_some(LifecycleState::Active as u8)
            })
            .map(LifecycleState::from_u8)
            .map_err(LifecycleState::from_u8);

        if result.is_ok() {
            self.activations.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Active -> `previous`, undoing an activation whose registration failed.
    pub(crate) fn rollback(&self, previous: LifecycleState) -> bool {
        let rolled_back = self
            .state
            .compare_exchange(
                LifecycleState::Active as u8,
                previous as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if rolled_back {
            self.activations.fetch_sub(1, Ordering::Relaxed);
        }
        rolled_back
    }

    /// Active -> Cancelled. Only one concurrent caller wins.
    pub(crate) fn try_deactivate(&self) -> bool {
        self.state
            .compare_exchange(
                LifecycleState::Active as u8,
                LifecycleState::Cancelled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Moves to Disposed and returns the state it replaced.
    pub(crate) fn dispose(&self) -> LifecycleState {
        LifecycleState::from_u8(
            self.state
                .swap(LifecycleState::Disposed as u8, Ordering::AcqRel),
        )
    }

    pub(crate) fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lifecycle, LifecycleState};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn activate_then_deactivate_then_reactivate() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.try_activate(), Ok(LifecycleState::Idle));
        assert_eq!(lifecycle.try_activate(), Err(LifecycleState::Active));
        assert!(lifecycle.try_deactivate());
        assert!(!lifecycle.try_deactivate());
        assert_eq!(lifecycle.try_activate(), Ok(LifecycleState::Cancelled));
        assert_eq!(lifecycle.activations(), 2);
    }

    #[test]
    fn rollback_restores_previous_state() {
        let lifecycle = Lifecycle::new();
        let previous = lifecycle.try_activate().unwrap();
        assert!(lifecycle.rollback(previous));
        assert_eq!(lifecycle.load(), LifecycleState::Idle);
        assert_eq!(lifecycle.activations(), 0);
        assert!(!lifecycle.rollback(previous));
    }

    #[test]
    fn disposed_is_terminal() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.dispose(), LifecycleState::Idle);
        assert_eq!(lifecycle.try_activate(), Err(LifecycleState::Disposed));
        assert!(!lifecycle.try_deactivate());
        assert_eq!(lifecycle.dispose(), LifecycleState::Disposed);
    }

    #[test]
    fn concurrent_activation_has_exactly_one_winner() {
        let lifecycle = Arc::new(Lifecycle::new());
        let winners: usize = (0..8)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                thread::spawn(move || lifecycle.try_activate().is_ok())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| usize::from(handle.join().unwrap()))
            .sum();
        assert_eq!(winners, 1);
        assert!(lifecycle.is_active());
    }
}
