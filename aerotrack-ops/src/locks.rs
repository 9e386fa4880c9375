use aerotrack_core::FlightId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Mutex<HashMap<FlightId, Arc<AsyncMutex<()>>>>;

/// Per-flight mutual exclusion. Every command touching a flight holds its
/// guard until the command's transaction has finished. An entry lives only
/// while someone holds or waits for it.
#[derive(Default)]
pub struct FlightLocks {
    table: Arc<LockTable>,
}

/// Held lock on one flight. Dropping it releases the flight and prunes the
/// table entry once nobody else is queued on it.
pub struct FlightGuard {
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<LockTable>,
    id: FlightId,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Waiters clone the slot under this same lock, so a count of one means
        // the table holds the only reference.
        if table.get(&self.id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            table.remove(&self.id);
        }
    }
}

impl FlightLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &FlightId) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        table.entry(id.clone()).or_default().clone()
    }

    pub async fn lock(&self, id: &FlightId) -> FlightGuard {
        let guard = self.slot(id).lock_owned().await;
        FlightGuard {
            guard: Some(guard),
            table: self.table.clone(),
            id: id.clone(),
        }
    }

    /// Lock several flights in ascending id order.
    pub async fn lock_many(&self, ids: &[FlightId]) -> Vec<FlightGuard> {
        let mut ordered: Vec<&FlightId> = ids.iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for id in ordered {
            guards.push(self.lock(id).await);
        }
        guards
    }

    pub fn is_locked(&self, id: &FlightId) -> bool {
        let table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        table.get(id).is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Number of flights currently held or waited on.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_flight_is_serialized() {
        let locks = Arc::new(FlightLocks::new());
        let fl1 = FlightId::new("FL1");

        let guard = locks.lock(&fl1).await;
        assert!(locks.is_locked(&fl1));

        let waiter = {
            let locks = locks.clone();
            let fl1 = fl1.clone();
            tokio::spawn(async move {
                let _g = locks.lock(&fl1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(!locks.is_locked(&fl1));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_other_flights_are_independent() {
        let locks = FlightLocks::new();
        let _a = locks.lock(&FlightId::new("FL1")).await;
        assert!(!locks.is_locked(&FlightId::new("FL2")));
    }

    #[tokio::test]
    async fn test_lock_many_dedups() {
        let locks = FlightLocks::new();
        let ids = vec![FlightId::new("FL2"), FlightId::new("FL1"), FlightId::new("FL2")];
        let guards = locks.lock_many(&ids).await;
        assert_eq!(guards.len(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = FlightLocks::new();
        for n in 0..1_000 {
            let guard = locks.lock(&FlightId::new(format!("FL{}", n))).await;
            assert_eq!(locks.len(), 1);
            drop(guard);
        }
        assert!(locks.is_empty());

        let guards = locks.lock_many(&[FlightId::new("FL1"), FlightId::new("FL2")]).await;
        assert_eq!(locks.len(), 2);
        drop(guards);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_is_locked_does_not_create_entries() {
        let locks = FlightLocks::new();
        assert!(!locks.is_locked(&FlightId::new("FL404")));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(FlightLocks::new());
        let fl1 = FlightId::new("FL1");
        let first = locks.lock(&fl1).await;

        let waiter = {
            let locks = locks.clone();
            let fl1 = fl1.clone();
            tokio::spawn(async move {
                let _g = locks.lock(&fl1).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(locks.is_locked(&fl1));
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
