//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Broadcast pipeline produces:
//!     → logging.rs (structured log events, one span per broadcast)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Broadcast ID flows through every event of one pipeline run
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;
