//! Observability: structured JSON logging and atomic metrics
//!
//! ```ignore
//! use tenantql::observability::{Logger, MetricsRegistry};
//!
//! Logger::info("QUERY_EXECUTED", &[("tenant", "acme"), ("rows", "3")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//! ```

mod logger;
mod metrics;
mod timer;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use timer::Timer;
