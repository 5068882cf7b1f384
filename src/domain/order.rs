use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, instrument};

use crate::domain::{IdAllocator, OrderStatus};
use crate::error::{OrderError, OrderStep, StepError};

/// Everything the guard protects.
#[derive(Debug, Default)]
struct OrderState {
    id: u64,
    items: Vec<String>,
    status: OrderStatus,
}

impl OrderState {
    /// Fails unless the order is currently in `required`.
    fn require(&self, required: OrderStatus, operation: &'static str) -> Result<(), OrderError> {
        if self.status == required {
            return Ok(());
        }
        error!(
            order_id = self.id,
            operation,
            status = %self.status,
            "Invalid order status"
        );
        Err(OrderError::InvalidState {
            operation,
            status: self.status,
        })
    }
}

/// Point-in-time copy of an order, taken under its guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub id: u64,
    pub items: Vec<String>,
    pub status: OrderStatus,
}

/// A purchase in progress.
///
/// All state sits behind one mutex. Each operation holds it for its whole
/// body, so the status check and the mutation it guards happen atomically and
/// concurrent callers on the same order are serialised in lock order. Orders
/// are independent of each other; share one between threads with `Arc`.
pub struct Order {
    state: Mutex<OrderState>,
    ids: Arc<dyn IdAllocator>,
}

impl Order {
    /// Creates an empty order in `Created` whose id is drawn from `ids` when
    /// the first item is added.
    pub fn new(ids: Arc<dyn IdAllocator>) -> Self {
        Self::with_id(0, ids)
    }

    /// Creates an order with a caller-chosen id. An id of 0 leaves it unset.
    pub fn with_id(id: u64, ids: Arc<dyn IdAllocator>) -> Self {
        Self {
            state: Mutex::new(OrderState {
                id,
                ..OrderState::default()
            }),
            ids,
        }
    }

    // A panic while holding the guard cannot leave the state half-written:
    // every mutation is a single push or assignment after its checks.
    fn lock(&self) -> MutexGuard<'_, OrderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.lock().id
    }

    pub fn status(&self) -> OrderStatus {
        self.lock().status
    }

    pub fn items(&self) -> Vec<String> {
        self.lock().items.clone()
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        let state = self.lock();
        OrderSnapshot {
            id: state.id,
            items: state.items.clone(),
            status: state.status,
        }
    }

    /// Appends an item. Only allowed while the order is `Created`.
    ///
    /// The first successful call assigns the order id if none was given at
    /// construction.
    #[instrument(skip_all)]
    pub fn add_item(&self, name: impl Into<String>) -> Result<(), OrderError> {
        let name = name.into();
        let mut state = self.lock();
        state.require(OrderStatus::Created, "add_item")?;

        if name.trim().is_empty() {
            error!(order_id = state.id, "Rejected empty item name");
            return Err(OrderError::EmptyItemName);
        }

        if state.id == 0 {
            state.id = self.ids.next_id();
            info!(order_id = state.id, "Order id assigned");
        }

        info!(order_id = state.id, product = %name, "Item added");
        state.items.push(name);
        Ok(())
    }

    /// Records payment. Placeholder transition, no gateway is contacted.
    #[instrument(skip_all)]
    pub fn pay(&self) -> Result<(), OrderError> {
        let mut state = self.lock();
        state.require(OrderStatus::Created, "pay")?;
        state.status = OrderStatus::Paid;
        info!(order_id = state.id, "Payment performed");
        Ok(())
    }

    /// Confirms delivery of a paid order.
    #[instrument(skip_all)]
    pub fn deliver(&self) -> Result<(), OrderError> {
        let mut state = self.lock();
        state.require(OrderStatus::Paid, "deliver")?;
        state.status = OrderStatus::Delivered;
        info!(order_id = state.id, "Delivery performed");
        Ok(())
    }

    /// Adds every item in order, then pays, then delivers.
    ///
    /// Stops at the first failing step. Steps already applied are kept; an
    /// order whose payment failed still holds the items added before it.
    #[instrument(skip_all, fields(item_count = items.len()))]
    pub fn perform_order<S: AsRef<str>>(&self, items: &[S]) -> Result<(), StepError> {
        for item in items {
            let item = item.as_ref();
            self.add_item(item)
                .map_err(|e| StepError::new(OrderStep::AddItem(item.to_string()), e))?;
        }
        self.pay().map_err(|e| StepError::new(OrderStep::Pay, e))?;
        self.deliver()
            .map_err(|e| StepError::new(OrderStep::Deliver, e))?;
        Ok(())
    }
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Order")
            .field("id", &state.id)
            .field("items", &state.items)
            .field("status", &state.status)
            .field("ids", &self.ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SequentialIds;
    use std::collections::HashSet;
    use std::sync::Barrier;

    fn new_order() -> Order {
        Order::new(Arc::new(SequentialIds::new()))
    }

    fn invalid(operation: &'static str, status: OrderStatus) -> OrderError {
        OrderError::InvalidState { operation, status }
    }

    fn successor(status: OrderStatus) -> Option<OrderStatus> {
        match status {
            OrderStatus::Created => Some(OrderStatus::Paid),
            OrderStatus::Paid => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    #[test]
    fn test_new_order_is_empty_and_unassigned() {
        let order = new_order();
        assert_eq!(
            order.snapshot(),
            OrderSnapshot {
                id: 0,
                items: vec![],
                status: OrderStatus::Created,
            }
        );
    }

    #[test]
    fn test_first_item_assigns_id_once() {
        let order = Order::new(Arc::new(SequentialIds::starting_at(41)));
        order.add_item("bread").unwrap();
        assert_eq!(order.id(), 41);

        order.add_item("eggs").unwrap();
        order.add_item("bread").unwrap();
        assert_eq!(order.id(), 41);
        assert_eq!(order.items(), vec!["bread", "eggs", "bread"]);
    }

    #[test]
    fn test_preseeded_id_is_kept() {
        let order = Order::with_id(7, Arc::new(SequentialIds::starting_at(100)));
        order.add_item("milk").unwrap();
        assert_eq!(order.id(), 7);
    }

    #[test]
    fn test_empty_item_name_is_rejected_without_side_effects() {
        let order = new_order();
        assert_eq!(order.add_item(""), Err(OrderError::EmptyItemName));
        assert_eq!(order.add_item("   "), Err(OrderError::EmptyItemName));
        assert_eq!(order.id(), 0);
        assert!(order.items().is_empty());
    }

    #[test]
    fn test_empty_item_name_on_paid_order_reports_status() {
        let order = new_order();
        order.pay().unwrap();
        assert_eq!(order.add_item(""), Err(invalid("add_item", OrderStatus::Paid)));
    }

    #[test]
    fn test_empty_item_name_keeps_assigned_id() {
        let order = Order::with_id(12, Arc::new(SequentialIds::new()));
        assert_eq!(order.add_item(" "), Err(OrderError::EmptyItemName));
        assert_eq!(order.id(), 12);
        assert!(order.items().is_empty());
    }

    #[test]
    fn test_add_item_after_pay_fails() {
        let order = new_order();
        order.pay().unwrap();
        assert_eq!(order.add_item("eggs"), Err(invalid("add_item", OrderStatus::Paid)));
        assert!(order.items().is_empty());
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_deliver_on_fresh_order_fails() {
        let order = new_order();
        assert_eq!(order.deliver(), Err(invalid("deliver", OrderStatus::Created)));
        assert_eq!(order.status(), OrderStatus::Created);
    }

    #[test]
    fn test_pay_twice_fails_second_time() {
        let order = new_order();
        order.add_item("butter").unwrap();
        order.pay().unwrap();
        assert_eq!(order.pay(), Err(invalid("pay", OrderStatus::Paid)));
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_deliver_reaches_terminal_status() {
        let order = new_order();
        order.add_item("bread").unwrap();
        order.pay().unwrap();
        order.deliver().unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);

        assert_eq!(order.deliver(), Err(invalid("deliver", OrderStatus::Delivered)));
        assert_eq!(order.pay(), Err(invalid("pay", OrderStatus::Delivered)));
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_status_never_regresses() {
        let order = new_order();
        let mut last = order.status();
        let attempts: [fn(&Order) -> Result<(), OrderError>; 7] = [
            |o| o.deliver(),
            |o| o.add_item("a"),
            |o| o.pay(),
            |o| o.add_item("b"),
            |o| o.pay(),
            |o| o.deliver(),
            |o| o.add_item("c"),
        ];
        for attempt in attempts {
            let _ = attempt(&order);
            let now = order.status();
            assert!(now >= last, "status went from {last} to {now}");
            assert!(now == last || successor(last) == Some(now), "skipped from {last} to {now}");
            last = now;
        }
        assert_eq!(order.items(), vec!["a"]);
    }

    #[test]
    fn test_perform_order_happy_path() {
        let order = new_order();
        order.perform_order(&["bread", "eggs", "butter"]).unwrap();

        let snapshot = order.snapshot();
        assert_eq!(snapshot.status, OrderStatus::Delivered);
        assert_eq!(snapshot.items, vec!["bread", "eggs", "butter"]);
        assert_ne!(snapshot.id, 0);
    }

    #[test]
    fn test_perform_order_stops_at_failed_step_without_rollback() {
        let order = new_order();
        order.perform_order(&["laptop"]).unwrap();

        let err = order.perform_order(&["smartphone"]).unwrap_err();
        assert_eq!(err.step, OrderStep::AddItem("smartphone".into()));
        assert_eq!(err.source, invalid("add_item", OrderStatus::Delivered));
        assert_eq!(order.items(), vec!["laptop"]);
    }

    #[test]
    fn test_perform_order_reports_payment_step() {
        let order = new_order();
        order.add_item("bread").unwrap();
        order.pay().unwrap();
        order.deliver().unwrap();

        let err = order.perform_order::<&str>(&[]).unwrap_err();
        assert_eq!(err.step, OrderStep::Pay);
    }

    #[test]
    fn test_perform_order_with_no_items_keeps_id_unset() {
        let order = new_order();
        order.perform_order::<String>(&[]).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.id(), 0);
    }

    #[test]
    fn test_concurrent_add_on_shared_order() {
        for _ in 0..50 {
            let order = new_order();
            let barrier = Barrier::new(2);

            let ids: Vec<u64> = std::thread::scope(|s| {
                let handles: Vec<_> = ["bread", "eggs"]
                    .into_iter()
                    .map(|item| {
                        let order = &order;
                        let barrier = &barrier;
                        s.spawn(move || {
                            barrier.wait();
                            order.add_item(item).unwrap();
                            order.id()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let mut items = order.items();
            items.sort();
            assert_eq!(items, vec!["bread", "eggs"]);
            // the allocator was consulted exactly once
            assert_eq!(order.id(), 1);
            assert!(ids.iter().all(|id| *id == order.id()));
        }
    }

    #[test]
    fn test_many_writers_lose_no_items() {
        let order = new_order();
        let threads = 8;
        let per_thread = 250;

        std::thread::scope(|s| {
            for t in 0..threads {
                let order = &order;
                s.spawn(move || {
                    for i in 0..per_thread {
                        order.add_item(format!("item-{t}-{i}")).unwrap();
                    }
                });
            }
        });

        let items = order.items();
        assert_eq!(items.len(), threads * per_thread);
        let unique: HashSet<_> = items.iter().collect();
        assert_eq!(unique.len(), items.len());

        // each writer's own items keep their relative order
        for t in 0..threads {
            let prefix = format!("item-{t}-");
            let mine: Vec<usize> = items
                .iter()
                .filter_map(|item| item.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(mine, (0..per_thread).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_concurrent_pay_succeeds_exactly_once() {
        let order = new_order();
        order.add_item("bread").unwrap();

        let successes = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| order.pay().is_ok())).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(successes, 1);
        assert_eq!(order.status(), OrderStatus::Paid);
    }
}
