use anyhow::Result;
use std::io::Write;

use ngscan_ocr::BatchReport;

use crate::cli::Format;

pub fn write_report<W: Write>(report: &BatchReport, format: Format, out: &mut W) -> Result<()> {
    match format {
        Format::Text => {
            for id in &report.ids {
                writeln!(out, "{id}")?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Per-source summary on the log stream, so stdout stays machine-readable.
pub fn log_summary(report: &BatchReport) {
    for image in &report.images {
        match &image.error {
            Some(e) => tracing::warn!("{}: {e}", image.source),
            None if image.failed_passes > 0 => tracing::warn!(
                "{}: {} recognition pass(es) failed",
                image.source,
                image.failed_passes
            ),
            None => {}
        }
    }
    if report.ids.is_empty() {
        tracing::info!("No IDs extracted");
    }
}
