//! Portfolio series export as CSV (`date,stock,cash,total_aum`).

use std::fs::{self, File};
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct SeriesCsvReport;

impl ReportPort for SeriesCsvReport {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(output_path)?;
        let mut writer = csv::Writer::from_writer(file);
        for snapshot in result.portfolio.snapshots() {
            writer.serialize(snapshot).map_err(|e| BacktestError::Report {
                reason: format!("failed to write {}: {}", output_path.display(), e),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
