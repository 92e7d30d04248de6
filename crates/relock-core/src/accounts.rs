//! Active account enumeration

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reports how many authenticated accounts are active
pub trait AccountDirectory: Send + Sync {
    /// Number of active accounts
    fn active_account_count(&self) -> usize;
}

/// A fixed count
impl AccountDirectory for usize {
    fn active_account_count(&self) -> usize {
        *self
    }
}

impl<F> AccountDirectory for F
where
    F: Fn() -> usize + Send + Sync,
{
    fn active_account_count(&self) -> usize {
        self()
    }
}

/// Shared account counter for hosts without an account manager
#[derive(Debug, Clone, Default)]
pub struct ActiveAccounts {
    count: Arc<AtomicUsize>,
}

impl ActiveAccounts {
    /// Start at `count`
    pub fn new(count: usize) -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(count)),
        }
    }

    /// Overwrite the count
    pub fn set(&self, count: usize) {
        self.count.store(count, Ordering::Release);
    }

    /// An account signed in
    pub fn increment(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(1))
            });
    }

    /// An account signed out
    pub fn decrement(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(1))
            });
    }
}

impl AccountDirectory for ActiveAccounts {
    fn active_account_count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_count() {
        assert_eq!(2usize.active_account_count(), 2);
    }

    #[test]
    fn test_closure_directory() {
        let directory = || 4usize;
        assert_eq!(directory.active_account_count(), 4);
    }

    #[test]
    fn test_counter_saturates_at_zero() {
        let accounts = ActiveAccounts::new(1);
        accounts.decrement();
        accounts.decrement();
        assert_eq!(accounts.active_account_count(), 0);

        accounts.increment();
        assert_eq!(accounts.active_account_count(), 1);
    }

    #[test]
    fn test_counter_shared_between_clones() {
        let accounts = ActiveAccounts::default();
        let handle = accounts.clone();
        handle.set(3);
        assert_eq!(accounts.active_account_count(), 3);
    }
}
