use std::fmt;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use pulse_core::RateBudgetReading;
use pulse_db::{Db, DbError};
use tracing::{info, warn};

/// Hourly allowance GitHub grants an authenticated token.
pub const DEFAULT_ALLOWANCE: u64 = 5000;
pub const DEFAULT_PROVIDER: &str = "github";
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(1);

pub trait RateBudget {
    /// Blocks until at least one more call may be made.
    fn acquire(&mut self);
    /// Replaces local state with the provider's own counters.
    fn update(&mut self, reading: RateBudgetReading);
    fn reading(&self) -> RateBudgetReading;
}

impl<B: RateBudget + ?Sized> RateBudget for Box<B> {
    fn acquire(&mut self) {
        (**self).acquire();
    }

    fn update(&mut self, reading: RateBudgetReading) {
        (**self).update(reading);
    }

    fn reading(&self) -> RateBudgetReading {
        (**self).reading()
    }
}

impl<B: RateBudget + ?Sized> RateBudget for &mut B {
    fn acquire(&mut self) {
        (**self).acquire();
    }

    fn update(&mut self, reading: RateBudgetReading) {
        (**self).update(reading);
    }

    fn reading(&self) -> RateBudgetReading {
        (**self).reading()
    }
}

/// How long to sleep before the next call, if at all. Only an exhausted
/// budget (one call or fewer left) whose reset lies in the future waits.
pub fn wait_for(reading: RateBudgetReading, now: i64, margin: Duration) -> Option<Duration> {
    if reading.remaining > 1 || reading.reset_at <= now {
        return None;
    }
    let seconds = u64::try_from(reading.reset_at - now).unwrap_or(0);
    Some(Duration::from_secs(seconds) + margin)
}

fn initial_reading() -> RateBudgetReading {
    RateBudgetReading {
        remaining: DEFAULT_ALLOWANCE,
        reset_at: 0,
    }
}

#[derive(Debug, Clone)]
pub struct LocalRateBudget {
    reading: RateBudgetReading,
    margin: Duration,
}

impl Default for LocalRateBudget {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_MARGIN)
    }
}

impl LocalRateBudget {
    pub fn new(margin: Duration) -> Self {
        Self {
            reading: initial_reading(),
            margin,
        }
    }
}

impl RateBudget for LocalRateBudget {
    fn acquire(&mut self) {
        if let Some(wait) = wait_for(self.reading, Utc::now().timestamp(), self.margin) {
            info!(
                remaining = self.reading.remaining,
                reset_at = self.reading.reset_at,
                wait_secs = wait.as_secs(),
                "rate budget exhausted; sleeping until reset"
            );
            thread::sleep(wait);
        }
    }

    fn update(&mut self, reading: RateBudgetReading) {
        self.reading = reading;
    }

    fn reading(&self) -> RateBudgetReading {
        self.reading
    }
}

/// Somewhere several processes can publish and read the latest budget.
pub trait BudgetStore {
    type Error: fmt::Display;

    fn load(&self, provider: &str) -> Result<Option<RateBudgetReading>, Self::Error>;
    fn store(&self, provider: &str, reading: RateBudgetReading) -> Result<(), Self::Error>;
}

impl BudgetStore for Db {
    type Error = DbError;

    fn load(&self, provider: &str) -> Result<Option<RateBudgetReading>, Self::Error> {
        self.load_rate_budget(provider)
    }

    fn store(&self, provider: &str, reading: RateBudgetReading) -> Result<(), Self::Error> {
        self.store_rate_budget(provider, reading)
    }
}

/// A budget kept in a [`BudgetStore`] so that every process talking to the
/// same provider throttles against the same counters. Store failures are
/// logged and the embedded local state is used instead.
pub struct SharedRateBudget<S> {
    store: S,
    provider: String,
    local: LocalRateBudget,
}

impl<S: BudgetStore> SharedRateBudget<S> {
    pub fn new(store: S, provider: impl Into<String>, margin: Duration) -> Self {
        Self {
            store,
            provider: provider.into(),
            local: LocalRateBudget::new(margin),
        }
    }

    fn refresh(&mut self) {
        match self.store.load(&self.provider) {
            Ok(Some(reading)) => self.local.update(reading),
            Ok(None) => {}
            Err(err) => warn!(
                provider = %self.provider,
                error = %err,
                "shared rate budget unavailable; using local state"
            ),
        }
    }
}

impl<S: BudgetStore> RateBudget for SharedRateBudget<S> {
    fn acquire(&mut self) {
        self.refresh();
        self.local.acquire();
    }

    fn update(&mut self, reading: RateBudgetReading) {
        self.local.update(reading);
        if let Err(err) = self.store.store(&self.provider, reading) {
            warn!(
                provider = %self.provider,
                error = %err,
                "failed to publish rate budget"
            );
        }
    }

    fn reading(&self) -> RateBudgetReading {
        self.local.reading()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    fn reading(remaining: u64, reset_at: i64) -> RateBudgetReading {
        RateBudgetReading {
            remaining,
            reset_at,
        }
    }

    #[test]
    fn waits_only_when_exhausted_and_reset_pending() {
        let margin = Duration::from_secs(1);
        assert_eq!(wait_for(reading(5000, 2_000), 1_000, margin), None);
        assert_eq!(wait_for(reading(2, 2_000), 1_000, margin), None);
        assert_eq!(
            wait_for(reading(1, 1_060), 1_000, margin),
            Some(Duration::from_secs(61))
        );
        assert_eq!(
            wait_for(reading(0, 1_010), 1_000, Duration::ZERO),
            Some(Duration::from_secs(10))
        );
        assert_eq!(wait_for(reading(0, 1_000), 1_000, margin), None);
        assert_eq!(wait_for(reading(0, 900), 1_000, margin), None);
    }

    #[test]
    fn local_budget_starts_at_default_allowance() {
        let mut budget = LocalRateBudget::default();
        assert_eq!(budget.reading(), reading(DEFAULT_ALLOWANCE, 0));
        budget.acquire();
        budget.update(reading(4321, 99));
        assert_eq!(budget.reading(), reading(4321, 99));
    }

    #[derive(Default)]
    struct MemoryStore {
        readings: RefCell<HashMap<String, RateBudgetReading>>,
    }

    impl BudgetStore for &MemoryStore {
        type Error = String;

        fn load(&self, provider: &str) -> Result<Option<RateBudgetReading>, String> {
            Ok(self.readings.borrow().get(provider).copied())
        }

        fn store(&self, provider: &str, reading: RateBudgetReading) -> Result<(), String> {
            self.readings
                .borrow_mut()
                .insert(provider.to_string(), reading);
            Ok(())
        }
    }

    struct BrokenStore;

    impl BudgetStore for BrokenStore {
        type Error = String;

        fn load(&self, _provider: &str) -> Result<Option<RateBudgetReading>, String> {
            Err("store offline".to_string())
        }

        fn store(&self, _provider: &str, _reading: RateBudgetReading) -> Result<(), String> {
            Err("store offline".to_string())
        }
    }

    #[test]
    fn shared_budget_sees_other_writers() {
        let store = MemoryStore::default();
        let mut first = SharedRateBudget::new(&store, "github", Duration::ZERO);
        let mut second = SharedRateBudget::new(&store, "github", Duration::ZERO);

        first.update(reading(1234, 10));
        assert_eq!(second.reading(), reading(DEFAULT_ALLOWANCE, 0));
        second.acquire();
        assert_eq!(second.reading(), reading(1234, 10));
    }

    #[test]
    fn shared_budget_falls_back_to_local_state() {
        let mut budget = SharedRateBudget::new(BrokenStore, "github", Duration::ZERO);
        budget.acquire();
        budget.update(reading(777, 5));
        budget.acquire();
        assert_eq!(budget.reading(), reading(777, 5));
    }
}
