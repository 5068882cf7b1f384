use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::app_system::{DriverConfig, WorkItem};
use crate::domain::{IdAllocator, Order};

pub const PRIMARY_BASKET: [&str; 3] = ["bread", "eggs", "butter"];
pub const SECONDARY_BASKET: [&str; 2] = ["laptop", "smartphone"];

/// Builds the demo batch: per iteration, one order pre-seeded with the
/// iteration number and one order that gets its id on the first item.
///
/// `ids` must not hand out `1..=config.orders`; see [`DriverConfig::allocator`].
pub fn demo_batch(config: &DriverConfig, ids: Arc<dyn IdAllocator>) -> Vec<WorkItem> {
    let mut rng = rand::thread_rng();
    let mut basket = |items: &[&str]| {
        let mut items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        if config.shuffle_baskets {
            items.shuffle(&mut rng);
        }
        items
    };

    let mut work = Vec::with_capacity(config.orders.saturating_mul(2));
    for i in 1..=config.orders as u64 {
        let seeded = Arc::new(Order::with_id(i, Arc::clone(&ids)));
        work.push(WorkItem::new(seeded, basket(&PRIMARY_BASKET)));

        let unseeded = Arc::new(Order::new(Arc::clone(&ids)));
        work.push(WorkItem::new(unseeded, basket(&SECONDARY_BASKET)));
    }
    work
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SequentialIds;

    #[test]
    fn test_demo_batch_layout() {
        let config = DriverConfig {
            orders: 3,
            ..DriverConfig::default()
        };
        let work = demo_batch(&config, Arc::new(SequentialIds::starting_at(1000)));

        assert_eq!(work.len(), 6);
        for (n, pair) in work.chunks(2).enumerate() {
            assert_eq!(pair[0].order.id(), n as u64 + 1);
            assert_eq!(pair[0].items, PRIMARY_BASKET);
            assert_eq!(pair[1].order.id(), 0);
            assert_eq!(pair[1].items, SECONDARY_BASKET);
        }
    }

    #[test]
    fn test_shuffled_baskets_keep_their_items() {
        let config = DriverConfig {
            orders: 5,
            shuffle_baskets: true,
            ..DriverConfig::default()
        };
        for item in demo_batch(&config, Arc::new(SequentialIds::new())) {
            let mut items = item.items.clone();
            items.sort();
            let mut expected: Vec<String> = if items.len() == 3 {
                PRIMARY_BASKET.iter().map(|s| s.to_string()).collect()
            } else {
                SECONDARY_BASKET.iter().map(|s| s.to_string()).collect()
            };
            expected.sort();
            assert_eq!(items, expected);
        }
    }

    #[test]
    fn test_zero_orders_is_empty() {
        let config = DriverConfig {
            orders: 0,
            ..DriverConfig::default()
        };
        assert!(demo_batch(&config, Arc::new(SequentialIds::new())).is_empty());
    }
}
