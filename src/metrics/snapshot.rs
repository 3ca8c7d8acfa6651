#[derive(Debug, Default, Clone, Copy)]
pub struct SelectorMetricsSnapshot {
    pub select_calls: u64,
    pub select_hits: u64,
    pub select_misses: u64,

    pub stored_results: u64,
    pub bypassed_calls: u64,
    pub chain_resets: u64,
    pub clear_calls: u64,
    pub stale_evictions: u64,

    // gauges captured at snapshot time
    pub cached_results: usize,
    pub chain_depth: usize,
}
