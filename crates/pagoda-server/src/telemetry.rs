use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
struct RouteStat {
    count: u64,
    total_latency_us: u64,
}

/// Per-route request counters and latency sums, rendered in the
/// Prometheus text format at /metrics.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    stats: Mutex<BTreeMap<(String, u16), RouteStat>>,
}

impl RequestMetrics {
    pub fn observe_request(&self, route: &str, status: StatusCode, elapsed: Duration) {
        let Ok(mut stats) = self.stats.lock() else {
            return;
        };
        let entry = stats
            .entry((route.to_string(), status.as_u16()))
            .or_default();
        entry.count += 1;
        entry.total_latency_us = entry
            .total_latency_us
            .saturating_add(elapsed.as_micros().min(u128::from(u64::MAX)) as u64);
    }

    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let Ok(stats) = self.stats.lock() else {
            return String::new();
        };
        let mut out = String::with_capacity(256 + stats.len() * 96);
        out.push_str("# TYPE pagoda_http_requests_total counter\n");
        for ((route, status), stat) in stats.iter() {
            out.push_str(&format!(
                "pagoda_http_requests_total{{route=\"{route}\",status=\"{status}\"}} {}\n",
                stat.count
            ));
        }
        out.push_str("# TYPE pagoda_http_request_latency_us_sum counter\n");
        for ((route, status), stat) in stats.iter() {
            out.push_str(&format!(
                "pagoda_http_request_latency_us_sum{{route=\"{route}\",status=\"{status}\"}} {}\n",
                stat.total_latency_us
            ));
        }
        out
    }
}
