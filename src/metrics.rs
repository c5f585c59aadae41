#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<PiggyBackMetrics> = Lazy::new(PiggyBackMetrics::init);

#[cfg(feature = "metrics")]
pub struct PiggyBackMetrics {
    pub merges_total: Counter<u64>,
    pub fallback_loads_total: Counter<u64>,
    pub queries_total: Counter<u64>,
    pub query_errors_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl PiggyBackMetrics {
    pub fn init() -> Self {
        let meter = global::meter("piggyback");

        let merges_total = meter
            .u64_counter("piggyback_merges_total")
            .with_description("Queries rewritten with piggy-back fragments")
            .build();

        let fallback_loads_total = meter
            .u64_counter("piggyback_fallback_loads_total")
            .with_description("Reader calls that traversed the association")
            .build();

        let queries_total = meter
            .u64_counter("piggyback_queries_total")
            .with_description("Total queries executed")
            .build();

        let query_errors_total = meter
            .u64_counter("piggyback_query_errors_total")
            .with_description("Queries that failed")
            .build();

        let query_duration = meter
            .f64_histogram("piggyback_query_duration_seconds")
            .with_description("Duration of queries")
            .build();

        Self {
            merges_total,
            fallback_loads_total,
            queries_total,
            query_errors_total,
            query_duration,
        }
    }

    pub fn record_merge(&self) {
        self.merges_total.add(1, &[]);
    }

    pub fn record_fallback_load(&self) {
        self.fallback_loads_total.add(1, &[]);
    }

    pub fn record_query(&self, elapsed: std::time::Duration) {
        self.queries_total.add(1, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.add(1, &[]);
    }
}

/// Span constructors for the `tracing` feature
#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn merge_span(entity: &str) -> Span {
        tracing::debug_span!("piggy_back.merge", entity = %entity)
    }

    pub fn declare_span(entity: &str, name: &str) -> Span {
        tracing::debug_span!("piggy_back.declare", entity = %entity, name = %name)
    }

    pub fn execute_query_span(query: &str) -> Span {
        tracing::info_span!("piggy_back.query", db.statement = %query)
    }
}
