use events::{ProgressReporter, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::BacktestError;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Renders backtest progress as a terminal progress bar.
pub struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    pub fn new(total_bars: usize) -> Result<Self, BacktestError> {
        let bar = ProgressBar::new(total_bars as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)?
                .progress_chars("=>-"),
        );
        Ok(Self { bar })
    }

    /// A reporter that draws nothing, for non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, update: &ProgressUpdate) {
        self.bar.set_length(update.total_bars as u64);
        self.bar.set_position(update.bar_index as u64 + 1);
        self.bar.set_message(format!(
            "equity {:.2} | trades {} | open {}",
            update.equity, update.trades, update.open_positions
        ));
    }

    fn finish(&self) {
        self.bar.finish_with_message("Simulation complete.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn template_is_valid() {
        assert!(IndicatifReporter::new(10).is_ok());
    }

    #[test]
    fn position_tracks_processed_bars() {
        let reporter = IndicatifReporter::hidden();
        reporter.report(&ProgressUpdate {
            percent: 50.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            bar_index: 4,
            total_bars: 10,
            equity: Decimal::ONE_HUNDRED,
            trades: 0,
            open_positions: 0,
        });
        assert_eq!(reporter.position(), 5);
    }
}
