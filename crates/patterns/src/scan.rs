use core_types::Candle;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::PatternError;
use crate::orchestrator::PatternOrchestrator;
use crate::pattern::PatternInstance;

/// The patterns found in the window ending at `end_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowScan {
    pub end_index: usize,
    pub patterns: Vec<PatternInstance>,
}

/// Scans every `step`-th trailing window of `window_len` candles in parallel.
///
/// Each window is analysed independently and causally (it only sees candles up
/// to its own end), so the result matches what a bar-by-bar run would have
/// seen. Windows without patterns are omitted; results are in end-index order.
pub fn scan_windows(
    orchestrator: &PatternOrchestrator,
    candles: &[Candle],
    window_len: usize,
    step: usize,
    min_confidence: f64,
) -> Result<Vec<WindowScan>, PatternError> {
    if window_len == 0 {
        return Err(PatternError::InvalidScan(
            "window length must be greater than zero".to_string(),
        ));
    }
    if step == 0 {
        return Err(PatternError::InvalidScan(
            "step must be greater than zero".to_string(),
        ));
    }
    if candles.len() < window_len {
        return Ok(Vec::new());
    }

    let ends: Vec<usize> = (window_len - 1..candles.len()).step_by(step).collect();
    tracing::debug!(windows = ends.len(), window_len, step, "Scanning windows");

    let mut scans: Vec<WindowScan> = ends
        .into_par_iter()
        .filter_map(|end| {
            let start = end + 1 - window_len;
            let window = orchestrator.window(&candles[start..=end], start);
            let patterns = orchestrator.analyze(&window, min_confidence);
            (!patterns.is_empty()).then_some(WindowScan {
                end_index: end,
                patterns,
            })
        })
        .collect();
    scans.sort_by_key(|s| s.end_index);
    Ok(scans)
}
