//! Plain text rendering of scan events and summaries.

use std::io::{self, Write};

use playcheck_core::{ClassificationResult, JobState, MediaFile, ScanEvent, ScanSummary};

fn describe(file: &MediaFile) -> String {
    format!(
        "{}/{} {}",
        file.video_codec.as_deref().unwrap_or("?"),
        file.audio_codec.as_deref().unwrap_or("?"),
        file.resolution_label()
    )
}

/// Renders live events, numbering files as they are classified.
#[derive(Debug, Default)]
pub struct EventWriter {
    processed: usize,
}

impl EventWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files classified so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Writes one live event as a single line.
    pub fn write(&mut self, out: &mut impl Write, event: &ScanEvent) -> io::Result<()> {
        if let ScanEvent::Classified(_) = event {
            self.processed += 1;
            write!(out, "[{}] ", self.processed)?;
        }
        write_event(out, event)
    }
}

fn write_event(out: &mut impl Write, event: &ScanEvent) -> io::Result<()> {
    match event {
        // Every discovered file is reported once classified
        ScanEvent::Discovered { .. } => Ok(()),
        ScanEvent::Classified(result) => match result {
            ClassificationResult::Supported(file) => {
                writeln!(out, "supported    {} ({})", file.path.display(), describe(file))
            }
            ClassificationResult::Unsupported(file) => {
                writeln!(out, "unsupported  {} ({})", file.path.display(), describe(file))
            }
            ClassificationResult::Unreadable { file, reason } => {
                writeln!(out, "unreadable   {}: {}", file.path.display(), reason)
            }
        },
        ScanEvent::ConversionStarted {
            source,
            output_path,
        } => writeln!(
            out,
            "converting   {} -> {}",
            source.display(),
            output_path.display()
        ),
        ScanEvent::ConversionProgress(progress) => writeln!(
            out,
            "progress     {} {:.1}%",
            progress.source.display(),
            progress.percent
        ),
        ScanEvent::ConversionDone(outcome) => match (&outcome.state, &outcome.error) {
            (JobState::Succeeded, _) => writeln!(
                out,
                "converted    {} -> {}",
                outcome.source.display(),
                outcome.output_path.display()
            ),
            (JobState::Cancelled, _) => {
                writeln!(out, "cancelled    {}", outcome.source.display())
            }
            (_, Some(error)) => {
                writeln!(out, "failed       {}: {}", outcome.source.display(), error)?;
                if let Some(diagnostic) = error.diagnostic() {
                    for line in diagnostic.lines() {
                        writeln!(out, "    {}", line)?;
                    }
                }
                Ok(())
            }
            (_, None) => writeln!(out, "failed       {}", outcome.source.display()),
        },
    }
}

/// Writes the final report.
pub fn write_summary(out: &mut impl Write, summary: &ScanSummary) -> io::Result<()> {
    writeln!(out, "Scanned {}", summary.root.display())?;

    writeln!(out, "\nSupported files ({}):", summary.supported.len())?;
    for path in &summary.supported {
        writeln!(out, "  {}", path.display())?;
    }

    writeln!(out, "\nUnsupported files ({}):", summary.unsupported.len())?;
    for path in &summary.unsupported {
        writeln!(out, "  {}", path.display())?;
    }

    writeln!(out, "\nFailed to process ({}):", summary.unreadable.len())?;
    for entry in &summary.unreadable {
        writeln!(out, "  {}: {}", entry.path.display(), entry.reason)?;
    }

    if !summary.conversions.is_empty() {
        writeln!(
            out,
            "\nConversions: {} succeeded, {} failed, {} cancelled",
            summary.conversions_in(JobState::Succeeded),
            summary.conversions_in(JobState::Failed),
            summary.conversions_in(JobState::Cancelled)
        )?;
        for outcome in &summary.conversions {
            let status = match &outcome.error {
                Some(error) if outcome.state != JobState::Cancelled => error.to_string(),
                _ => format!("{:?}", outcome.state).to_lowercase(),
            };
            writeln!(
                out,
                "  {} -> {} [{}]",
                outcome.source.display(),
                outcome.output_path.display(),
                status
            )?;
        }
    }

    if summary.cancelled {
        writeln!(out, "\nScan was cancelled.")?;
    }

    let elapsed = summary.finished_at - summary.started_at;
    writeln!(out, "\nFinished in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)
}
