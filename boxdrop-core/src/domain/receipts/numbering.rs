use std::{any::type_name_of_val, fmt, sync::Arc};

use tokio::sync::Mutex;
use tracing::debug;

use crate::database::ports::deliveries::DeliveryRepository;
use crate::error::Result;

/// Lowest receipt number ever issued. Earlier numbers belong to the paper
/// receipt books that preceded this system.
pub const RECEIPT_NUMBER_FLOOR: i64 = 17421;

/// Next number after the highest persisted one, never below the floor.
pub fn next_receipt_number(last_issued: Option<i64>) -> i64 {
    match last_issued {
        Some(last) if last >= RECEIPT_NUMBER_FLOOR => last + 1,
        _ => RECEIPT_NUMBER_FLOOR,
    }
}

/// Issues receipt numbers one caller at a time.
///
/// The persisted maximum is only updated once a receipt is rendered, so two
/// workflows reading it back to back would see the same value. The allocator
/// keeps the last number it handed out behind an async mutex and never issues
/// anything at or below it, which makes concurrent allocations distinct and
/// consecutive. A number whose render fails is not reused.
pub struct ReceiptNumberAllocator<R>
where
    R: DeliveryRepository + ?Sized,
{
    repository: Arc<R>,
    last_issued: Mutex<Option<i64>>,
}

impl<R> fmt::Debug for ReceiptNumberAllocator<R>
where
    R: DeliveryRepository + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptNumberAllocator")
            .field("repository", &type_name_of_val(self.repository.as_ref()))
            .finish_non_exhaustive()
    }
}

impl<R> ReceiptNumberAllocator<R>
where
    R: DeliveryRepository + ?Sized,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            last_issued: Mutex::new(None),
        }
    }

    pub async fn allocate(&self) -> Result<i64> {
        let mut last_issued = self.last_issued.lock().await;

        let persisted = self.repository.max_receipt_number().await?;
        let mut next = next_receipt_number(persisted);
        if let Some(previous) = *last_issued {
            next = next.max(previous + 1);
        }

        *last_issued = Some(next);
        debug!(?persisted, receipt_number = next, "receipt number allocated");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ports::deliveries::MockDeliveryRepository;
    use std::collections::HashSet;
    use tokio::sync::Barrier;

    fn repo_with_max(max: Option<i64>) -> Arc<MockDeliveryRepository> {
        let mut repo = MockDeliveryRepository::new();
        repo.expect_max_receipt_number()
            .returning(move || Ok(max));
        Arc::new(repo)
    }

    #[test]
    fn empty_history_starts_at_floor() {
        assert_eq!(next_receipt_number(None), 17421);
    }

    #[test]
    fn history_at_floor_increments() {
        assert_eq!(next_receipt_number(Some(17421)), 17422);
    }

    #[test]
    fn history_below_floor_is_lifted_to_floor() {
        assert_eq!(next_receipt_number(Some(10000)), 17421);
        assert_eq!(next_receipt_number(Some(17420)), 17421);
    }

    #[tokio::test]
    async fn allocator_follows_persisted_history() {
        let allocator = ReceiptNumberAllocator::new(repo_with_max(Some(18000)));
        assert_eq!(allocator.allocate().await.unwrap(), 18001);
    }

    #[tokio::test]
    async fn unpersisted_numbers_are_not_reissued() {
        let allocator = ReceiptNumberAllocator::new(repo_with_max(None));
        assert_eq!(allocator.allocate().await.unwrap(), 17421);
        assert_eq!(allocator.allocate().await.unwrap(), 17422);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_are_distinct_and_consecutive() {
        const CALLERS: i64 = 32;
        let allocator = Arc::new(ReceiptNumberAllocator::new(repo_with_max(Some(17500))));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                tokio::spawn(async move { allocator.allocate().await.unwrap() })
            })
            .collect();

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap());
        }
        issued.sort_unstable();

        let expected: Vec<i64> = (17501..17501 + CALLERS).collect();
        assert_eq!(issued, expected);
    }

    /// Reading the maximum and deciding without a lock lets every caller see
    /// the same history. This is the collision the allocator exists to avoid.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unsynchronized_read_then_decide_collides() {
        const CALLERS: usize = 8;
        let repo = repo_with_max(None);
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    let persisted = repo.max_receipt_number().await.unwrap();
                    // Every caller has read before anyone commits.
                    barrier.wait().await;
                    next_receipt_number(persisted)
                })
            })
            .collect();

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap());
        }
        let distinct: HashSet<i64> = issued.iter().copied().collect();
        assert!(distinct.len() < issued.len(), "expected duplicate numbers");
    }
}
