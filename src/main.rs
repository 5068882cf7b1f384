mod app_system;
mod domain;
mod error;


use tracing::{error, info, Instrument};

use crate::app_system::{demo_batch, setup_tracing, DriverConfig, OrderSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = DriverConfig::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e.to_string()
    })?;
    info!(
        orders = config.orders,
        concurrency = config.concurrency,
        id_scheme = ?config.id_scheme,
        "Starting order run"
    );

    let work = demo_batch(&config, config.allocator());
    let orders: Vec<_> = work.iter().map(|item| item.order.clone()).collect();

    let system = OrderSystem::new(config.concurrency);
    let outcomes = system
        .run(work)
        .instrument(tracing::info_span!("order_processing"))
        .await;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => {
                let snapshot = orders[outcome.index].snapshot();
                info!(
                    order_id = snapshot.id,
                    status = %snapshot.status,
                    items = ?snapshot.items,
                    "Order performed"
                );
            }
            // steps applied before the failure are kept
            Err(e) => error!(
                order_id = outcome.order_id,
                status = %outcome.status,
                items = ?orders[outcome.index].items(),
                error = %e,
                "Error performing order"
            ),
        }
    }

    let summary = OrderSystem::summarize(&outcomes);
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Order run completed"
    );
    Ok(())
}
