//! Per-spot writer gate
//!
//! Serializes reservation writes against the same spot inside this process.
//! Writes to different spots never contend. Combined with the `FOR UPDATE`
//! on the spot row this keeps same-spot writers ordered on every backend,
//! including SQLite which ignores row locks.
//!
//! Entries live only while someone holds or waits for the gate, so the map
//! stays bounded by the number of in-flight writers.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Gate = Arc<Mutex<()>>;

#[derive(Debug, Default)]
pub struct SpotLocks {
    locks: DashMap<i32, Gate>,
}

impl SpotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `spot_id`. Released when the guard drops.
    pub async fn acquire(&self, spot_id: i32) -> SpotGuard<'_> {
        let gate = self
            .locks
            .entry(spot_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // Built before waiting so a cancelled acquire still releases its entry
        let mut guard = SpotGuard {
            owner: self,
            spot_id,
            gate,
            held: None,
        };
        let pending = guard.gate.clone().lock_owned();
        guard.held = Some(pending.await);
        guard
    }

    /// Number of spots currently held or awaited
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }

    // Runs after the mutex is released. The shard lock taken by `remove_if`
    // keeps new acquirers from cloning the gate while the count is checked;
    // 2 = the map's copy plus the releasing guard's.
    fn release(&self, spot_id: i32, gate: &Gate) {
        self.locks
            .remove_if(&spot_id, |_, current| {
                Arc::ptr_eq(current, gate) && Arc::strong_count(current) == 2
            });
    }
}

/// Exclusive access to one spot
pub struct SpotGuard<'a> {
    owner: &'a SpotLocks,
    spot_id: i32,
    gate: Gate,
    held: Option<OwnedMutexGuard<()>>,
}

impl SpotGuard<'_> {
    pub fn spot_id(&self) -> i32 {
        self.spot_id
    }
}

impl Drop for SpotGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        self.owner.release(self.spot_id, &self.gate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_spot_waits_other_spot_does_not() {
        let locks = Arc::new(SpotLocks::new());
        let held = locks.acquire(1).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(2)).await;
        assert!(other.is_ok(), "different spot must not block");

        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
        assert!(same.is_err(), "same spot must wait");

        drop(held);
        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
        assert!(same.is_ok());
        assert_eq!(locks.tracked(), 2);

        drop(same);
        drop(other);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(SpotLocks::new());
        let first = locks.acquire(7).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let guard = locks.acquire(7).await;
                guard.spot_id()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(waiter.await.unwrap(), 7);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn abandoned_wait_does_not_leak_an_entry() {
        let locks = SpotLocks::new();
        let first = locks.acquire(5).await;

        let gave_up = tokio::time::timeout(Duration::from_millis(20), locks.acquire(5)).await;
        assert!(gave_up.is_err());
        assert_eq!(locks.tracked(), 1);

        drop(first);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn contended_gate_still_serializes_and_drains() {
        let locks = Arc::new(SpotLocks::new());
        let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                tokio::spawn(async move {
                    let _guard = locks.acquire(3).await;
                    let now = inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    assert_eq!(now, 0, "two holders of one spot");
                    tokio::task::yield_now().await;
                    inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(locks.tracked(), 0);
    }
}
