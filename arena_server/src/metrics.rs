//! Prometheus metrics for the tournament server.
//!
//! Metrics are exposed in Prometheus text format when `METRICS_BIND` is set.
//! Without an installed exporter every recording call is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration by route and status
//! - **Tournament Metrics**: Creations, joins by outcome, overrides
//! - **Settlement Metrics**: Finalizations, refunds and coins moved
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use arena_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments/{id}/join", 200);
//! metrics::tournament_joins_total("ok");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

pub fn tournaments_created_total() {
    metrics::counter!("tournaments_created_total").increment(1);
}

/// Record a join attempt; `outcome` is `ok` or the error kind.
pub fn tournament_joins_total(outcome: &str) {
    metrics::counter!("tournament_joins_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn status_overrides_total(to_status: &str) {
    metrics::counter!("status_overrides_total",
        "to" => to_status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Settlement Metrics
// ============================================================================

pub fn settlements_total() {
    metrics::counter!("settlements_total").increment(1);
}

/// Record one cancellation and the number of entry fees it refunded.
pub fn refunds_total(refund_count: usize) {
    metrics::counter!("cancellations_total").increment(1);
    metrics::counter!("refunds_total").increment(refund_count as u64);
}

pub fn coins_paid_out_total(amount: i64) {
    if amount > 0 {
        metrics::counter!("coins_paid_out_total").increment(amount as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        tournaments_created_total();
        tournament_joins_total("state_conflict");
        refunds_total(3);
        coins_paid_out_total(0);
        coins_paid_out_total(250);
    }
}
