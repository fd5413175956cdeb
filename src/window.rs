// =============================================================================
// Window Assigner — tumbling-window bucketing of event timestamps
// =============================================================================
//
// Maps a trade's event time to the half-open interval
// [window_start_ms, window_end_ms) of fixed duration it belongs to:
//
//   window_start_ms = floor(event_time_ms / (duration_s * 1000)) * duration_s * 1000
//   window_end_ms   = window_start_ms + duration_s * 1000
//
// Pure function, no state.

use crate::error::PipelineError;

/// Assign `event_time_ms` to its tumbling window of `duration_s` seconds.
///
/// Returns `(window_start_ms, window_end_ms)`. Rejects negative timestamps
/// and zero duration with `InvalidArgument`.
pub fn assign(event_time_ms: i64, duration_s: u64) -> Result<(i64, i64), PipelineError> {
    if duration_s == 0 {
        return Err(PipelineError::invalid("window duration must be positive"));
    }
    if event_time_ms < 0 {
        return Err(PipelineError::invalid(format!(
            "event timestamp must be non-negative, got {event_time_ms}"
        )));
    }

    let duration_ms = duration_s as i64 * 1000;
    let window_start_ms = (event_time_ms / duration_ms) * duration_ms;
    Ok((window_start_ms, window_start_ms + duration_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_to_window_start() {
        assert_eq!(assign(0, 60).unwrap(), (0, 60_000));
        assert_eq!(assign(30_000, 60).unwrap(), (0, 60_000));
        assert_eq!(assign(59_999, 60).unwrap(), (0, 60_000));
    }

    #[test]
    fn window_boundary_is_half_open() {
        // Exactly at the boundary belongs to the next window.
        assert_eq!(assign(60_000, 60).unwrap(), (60_000, 120_000));
        assert_eq!(assign(65_000, 60).unwrap(), (60_000, 120_000));
    }

    #[test]
    fn window_span_matches_duration() {
        let (start, end) = assign(1_700_000_123_456, 300).unwrap();
        assert_eq!(end - start, 300_000);
        assert!(start <= 1_700_000_123_456 && 1_700_000_123_456 < end);
        assert_eq!(start % 300_000, 0);
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(assign(-1, 60).is_err());
        assert!(assign(1000, 0).is_err());
    }
}
