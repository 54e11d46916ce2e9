//! # Bounded FIFO Queue
//!
//! A fixed-capacity, multi-producer multi-consumer queue with blocking
//! insert and blocking remove. It is the only state shared between the
//! broker's connection handlers.
//!
//! ## Synchronization
//!
//! Storage is a `VecDeque` behind a `parking_lot::Mutex` that is only held
//! for the push or pop itself. Waiting happens on two counting semaphores:
//!
//! - `slots` counts free positions ("not full"); `put` acquires one
//! - `available` counts queued items ("not empty"); `take` acquires one
//!
//! A permit is consumed before touching storage and the opposite semaphore
//! is credited afterwards, so `0 <= len <= capacity` holds at every point
//! and a `take` that owns a permit always finds an item.
//!
//! ## Cancellation
//!
//! `put` and `take` are cancel-safe: a future dropped while waiting neither
//! inserts nor removes anything. [`BoundedQueue::close`] wakes every waiter
//! with [`ServerQueueError::Interrupted`].

use crate::{Result, ServerQueueError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Semaphore;

#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    slots: Semaphore,
    available: Semaphore,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or exceeds [`Semaphore::MAX_PERMITS`].
    /// [`crate::BrokerConfig::validate`] rejects both before a broker is built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be > 0");
        assert!(
            capacity <= Semaphore::MAX_PERMITS,
            "queue capacity exceeds semaphore limit"
        );

        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            slots: Semaphore::new(capacity),
            available: Semaphore::new(0),
            capacity,
        }
    }

    /// Insert `item` at the tail, waiting while the queue is full.
    ///
    /// Fails with `Interrupted` once the queue is closed; the item is dropped.
    pub async fn put(&self, item: T) -> Result<()> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| ServerQueueError::Interrupted)?;
        permit.forget();
        self.push(item);
        Ok(())
    }

    /// Remove the head item, waiting while the queue is empty.
    ///
    /// Fails with `Interrupted` once the queue is closed.
    pub async fn take(&self) -> Result<T> {
        let permit = self
            .available
            .acquire()
            .await
            .map_err(|_| ServerQueueError::Interrupted)?;
        permit.forget();
        Ok(self.pop())
    }

    /// Insert without waiting. Gives the item back if the queue is full or closed.
    pub fn try_put(&self, item: T) -> std::result::Result<(), T> {
        match self.slots.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.push(item);
                Ok(())
            }
            Err(_) => Err(item),
        }
    }

    /// Remove the head item without waiting.
    pub fn try_take(&self) -> Option<T> {
        let permit = self.available.try_acquire().ok()?;
        permit.forget();
        Some(self.pop())
    }

    /// Interrupt all current and future waiters.
    ///
    /// Items still queued stay in place but can no longer be taken.
    pub fn close(&self) {
        self.slots.close();
        self.available.close();
    }

    pub fn is_closed(&self) -> bool {
        self.available.is_closed()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&self, item: T) {
        {
            let mut items = self.items.lock();
            debug_assert!(items.len() < self.capacity);
            items.push_back(item);
        }
        self.available.add_permits(1);
    }

    fn pop(&self) -> T {
        let item = self
            .items
            .lock()
            .pop_front()
            .expect("an `available` permit always has a queued item behind it");
        self.slots.add_permits(1);
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const BLOCKED: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_put_take_fifo() {
        let queue = BoundedQueue::new(5);
        for i in 0..5 {
            queue.put(i).await.unwrap();
        }
        assert_eq!(queue.len(), 5);

        for i in 0..5 {
            assert_eq!(queue.take().await.unwrap(), i);
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_blocks_put_until_take() {
        // capacity 2: third put waits for a take
        let queue = Arc::new(BoundedQueue::new(2));
        queue.put("item1").await.unwrap();
        queue.put("item2").await.unwrap();
        assert_eq!(queue.len(), 2);

        let blocked = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.put("item3").await })
        };
        tokio::time::sleep(BLOCKED).await;
        assert!(!blocked.is_finished());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.take().await.unwrap(), "item1");
        timeout(Duration::from_secs(5), blocked)
            .await
            .expect("put should complete after a take")
            .unwrap()
            .unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take().await.unwrap(), "item2");
        assert_eq!(queue.take().await.unwrap(), "item3");
    }

    #[tokio::test]
    async fn test_empty_queue_blocks_take_until_put() {
        let queue = Arc::new(BoundedQueue::new(3));

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.take().await })
        };
        tokio::time::sleep(BLOCKED).await;
        assert!(!waiter.is_finished());

        queue.put(42).await.unwrap();
        let taken = timeout(Duration::from_secs(5), waiter)
            .await
            .expect("take should complete after a put")
            .unwrap()
            .unwrap();
        assert_eq!(taken, 42);
    }

    #[tokio::test]
    async fn test_close_interrupts_waiters() {
        let queue = Arc::new(BoundedQueue::<u32>::new(1));

        let taker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.take().await })
        };
        tokio::time::sleep(BLOCKED).await;

        queue.close();
        let result = timeout(Duration::from_secs(5), taker).await.unwrap().unwrap();
        assert!(matches!(result, Err(ServerQueueError::Interrupted)));

        assert!(queue.is_closed());
        assert!(matches!(queue.put(1).await, Err(ServerQueueError::Interrupted)));
    }

    #[tokio::test]
    async fn test_cancelled_put_does_not_insert() {
        let queue = BoundedQueue::new(1);
        queue.put(1).await.unwrap();

        let attempt = timeout(BLOCKED, queue.put(2)).await;
        assert!(attempt.is_err());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.take().await.unwrap(), 1);
        assert!(queue.try_take().is_none());
    }

    #[test]
    fn test_try_variants() {
        let queue = BoundedQueue::new(1);
        assert!(queue.try_take().is_none());
        assert_eq!(queue.try_put('a'), Ok(()));
        assert_eq!(queue.try_put('b'), Err('b'));
        assert_eq!(queue.try_take(), Some('a'));
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        let _ = BoundedQueue::<u8>::new(0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(u16),
        Take,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![any::<u16>().prop_map(Op::Put), Just(Op::Take)]
    }

    proptest! {
        #[test]
        fn prop_matches_fifo_model(
            capacity in 1usize..8,
            ops in proptest::collection::vec(op(), 0..200),
        ) {
            let queue = BoundedQueue::new(capacity);
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Op::Put(value) => {
                        let accepted = queue.try_put(value).is_ok();
                        prop_assert_eq!(accepted, model.len() < capacity);
                        if accepted {
                            model.push_back(value);
                        }
                    }
                    Op::Take => {
                        prop_assert_eq!(queue.try_take(), model.pop_front());
                    }
                }
                prop_assert!(queue.len() <= capacity);
                prop_assert_eq!(queue.len(), model.len());
            }
        }
    }
}
