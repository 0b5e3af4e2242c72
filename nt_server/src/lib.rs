//! HTTP and WebSocket surface for the Nexus tournament service.
//!
//! - [`api`]: router, handlers, error mapping and live event streams
//! - [`config`]: environment and CLI driven configuration
//! - [`logging`]: `tracing` subscriber setup
//! - [`metrics`]: Prometheus counters and gauges

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
