//! System orchestration: configuration, tracing setup, and the work
//! dispatcher that drives orders concurrently.

pub mod config;
pub mod order_system;
pub mod tracing;
pub mod workload;

pub use self::config::*;
pub use self::order_system::*;
pub use self::tracing::setup_tracing;
pub use self::workload::*;
