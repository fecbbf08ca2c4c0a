use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;

/// The three phases of a room that can have a pending expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    Preround,
    ActiveRound,
    Results,
}

impl RoundPhase {
    pub const ALL: [RoundPhase; 3] = [
        RoundPhase::Preround,
        RoundPhase::ActiveRound,
        RoundPhase::Results,
    ];
}

type TimerKey = (String, RoundPhase);

struct TimerSlot {
    token: u64,
    handle: JoinHandle<()>,
}

/// Process-wide bookkeeping of delayed callbacks, at most one per
/// (room, phase). Arming replaces and cancels any existing timer for the
/// key; a disarmed timer never runs its callback (the spawned task is
/// aborted, it does not check a flag). A firing timer removes its own slot
/// before running the callback, token-guarded so it never removes a newer
/// timer armed under the same key; the callback may therefore disarm or
/// rearm its own key without aborting itself.
#[derive(Default)]
pub struct TimerRegistry {
    slots: Arc<DashMap<TimerKey, TimerSlot>>,
    next_token: AtomicU64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm<F>(&self, code: &str, phase: RoundPhase, delay: Duration, callback: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key: TimerKey = (code.to_string(), phase);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let slots = Arc::clone(&self.slots);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Unregister first: while the slot exists it holds this task's
            // own handle, and a disarm from inside the callback would abort
            // the callback mid-flight.
            slots.remove_if(&task_key, |_, slot| slot.token == token);
            callback.await;
        });

        if let Some(previous) = self.slots.insert(key, TimerSlot { token, handle }) {
            previous.handle.abort();
        }
    }

    pub fn disarm(&self, code: &str, phase: RoundPhase) {
        if let Some((_, slot)) = self.slots.remove(&(code.to_string(), phase)) {
            slot.handle.abort();
        }
    }

    pub fn disarm_all(&self, code: &str) {
        for phase in RoundPhase::ALL {
            self.disarm(code, phase);
        }
    }

    pub fn is_armed(&self, code: &str, phase: RoundPhase) -> bool {
        self.slots.contains_key(&(code.to_string(), phase))
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counter_callback(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_armed_timer_fires_and_unregisters() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        registry.arm(
            "AB1CD",
            RoundPhase::Preround,
            Duration::from_millis(10),
            counter_callback(&fired),
        );
        assert!(registry.is_armed("AB1CD", RoundPhase::Preround));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed("AB1CD", RoundPhase::Preround));
    }

    #[tokio::test]
    async fn test_disarm_prevents_callback() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        registry.arm(
            "AB1CD",
            RoundPhase::ActiveRound,
            Duration::from_millis(20),
            counter_callback(&fired),
        );
        registry.disarm("AB1CD", RoundPhase::ActiveRound);
        assert!(!registry.is_armed("AB1CD", RoundPhase::ActiveRound));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rearm_replaces_pending_timer() {
        let registry = TimerRegistry::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        registry.arm(
            "AB1CD",
            RoundPhase::Results,
            Duration::from_millis(20),
            counter_callback(&first),
        );
        registry.arm(
            "AB1CD",
            RoundPhase::Results,
            Duration::from_millis(20),
            counter_callback(&second),
        );
        assert_eq!(registry.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disarm_all_clears_every_phase() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        for phase in RoundPhase::ALL {
            registry.arm("AB1CD", phase, Duration::from_millis(20), counter_callback(&fired));
        }
        registry.arm(
            "ZZ9ZZ",
            RoundPhase::Preround,
            Duration::from_millis(20),
            counter_callback(&fired),
        );
        assert_eq!(registry.pending_count(), 4);

        registry.disarm_all("AB1CD");
        assert_eq!(registry.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Only the other room's timer survived to fire.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_callback_may_disarm_its_own_key() {
        let registry = Arc::new(TimerRegistry::new());
        let fired = Arc::new(AtomicU32::new(0));

        let reg = Arc::clone(&registry);
        let counter = Arc::clone(&fired);
        registry.arm(
            "AB1CD",
            RoundPhase::ActiveRound,
            Duration::from_millis(10),
            async move {
                // A callback that cancels its own key, then suspends, must
                // still run to completion.
                reg.disarm("AB1CD", RoundPhase::ActiveRound);
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed("AB1CD", RoundPhase::ActiveRound));
    }

    #[tokio::test]
    async fn test_disarm_without_timer_is_noop() {
        let registry = TimerRegistry::new();
        registry.disarm("AB1CD", RoundPhase::Preround);
        registry.disarm_all("AB1CD");
        assert_eq!(registry.pending_count(), 0);
    }
}
