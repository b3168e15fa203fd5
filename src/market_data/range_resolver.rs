// =============================================================================
// Range Resolver — which parts of a requested window the cache cannot serve
// =============================================================================
//
// Only the edges are checked: data before the cached start and data after the
// cached end. A hole strictly inside `[first, last]` (for example left behind
// by an earlier partial fetch) is not detected here.
// =============================================================================

use super::candle_series::TimeWindow;

/// Sub-ranges of `desired` not covered by cached bounds `(first, last)`.
///
/// Leading gap comes before trailing gap. Adjacent ranges share their
/// boundary timestamp with the cached bounds, so remote tiers refetch the edge
/// candle and the merge overwrites it.
pub fn missing_ranges(cached: Option<(i64, i64)>, desired: TimeWindow) -> Vec<TimeWindow> {
    let Some((first, last)) = cached else {
        return vec![desired];
    };

    let mut ranges = Vec::with_capacity(2);
    if desired.start < first {
        ranges.push(TimeWindow::new(desired.start, first));
    }
    if desired.end > last {
        ranges.push(TimeWindow::new(last, desired.end));
    }
    ranges
}
