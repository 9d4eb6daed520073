use std::cell::{Cell, RefCell};
use std::io::{self, Write};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use serde::Serialize;

use crate::app::{PlanResult, ProgressEvent, ProgressSink};
use crate::domain::DownloadOutcome;
use crate::sync::SyncReport;

const UNKNOWN_TOTAL_REDRAW_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Console,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_plan(result: &PlanResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_report(report: &SyncReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable progress on stdout. When stdout is a terminal, transfers
/// get a single progress line redrawn in place.
pub struct ConsoleOutput {
    interactive: bool,
    current_file: RefCell<String>,
    bar_active: Cell<bool>,
    last_percent: Cell<Option<u8>>,
    last_bytes: Cell<u64>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::with_interactive(io::stdout().is_tty())
    }

    pub fn with_interactive(interactive: bool) -> Self {
        Self {
            interactive,
            current_file: RefCell::new(String::new()),
            bar_active: Cell::new(false),
            last_percent: Cell::new(None),
            last_bytes: Cell::new(0),
        }
    }

    pub fn print_plan(result: &PlanResult) {
        println!("Planned {} downloads:", result.targets.len());
        for target in &result.targets {
            println!("  {target}");
        }
    }

    pub fn print_report(report: &SyncReport) {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let red = "\x1b[31m";
        let reset = "\x1b[0m";

        println!();
        println!(
            "{green}Downloaded: {} ({}){reset}",
            report.downloaded(),
            bytes_to_human(report.bytes_downloaded())
        );
        println!("{yellow}Skipped: {}{reset}", report.skipped());
        println!("{red}Failed: {}{reset}", report.failed());
        for item in &report.items {
            if let DownloadOutcome::Failed { reason } = &item.outcome {
                println!("{red}  {}: {reason}{reset}", item.file_name);
            }
        }
        println!("\nAll downloads completed.");
    }

    fn draw_progress(&self, received: u64, total: u64) {
        if !self.interactive {
            return;
        }
        if total > 0 {
            let percent = ((received.min(total) * 100) / total) as u8;
            if self.last_percent.get() == Some(percent) {
                return;
            }
            self.last_percent.set(Some(percent));
        } else {
            if self.bar_active.get()
                && received.saturating_sub(self.last_bytes.get()) < UNKNOWN_TOTAL_REDRAW_BYTES
            {
                return;
            }
            self.last_bytes.set(received);
        }
        let file_name = self.current_file.borrow();
        let line = if total > 0 {
            let percent = self.last_percent.get().unwrap_or(0);
            format!(
                "{file_name} {} {} / {}",
                progress_bar(percent),
                bytes_to_human(received),
                bytes_to_human(total)
            )
        } else {
            format!("{file_name} {} received", bytes_to_human(received))
        };
        redraw_line(&line).ok();
        self.bar_active.set(true);
    }

    fn end_progress(&self) {
        if self.bar_active.replace(false) {
            println!();
        }
        self.last_percent.set(None);
        self.last_bytes.set(0);
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::CatalogRecord { index, record } => {
                if index == 1 {
                    println!("JSON response:");
                }
                println!("Item {index}: {record}");
            }
            ProgressEvent::CatalogFiltered { eligible, .. } => {
                println!("Found {eligible} files to download.");
            }
            ProgressEvent::TargetStarted {
                index,
                total,
                file_name,
            } => {
                self.current_file.replace(file_name.clone());
                println!(
                    "\nDownloading file {index}/{total} (Remaining: {}): {file_name}",
                    total - index
                );
            }
            ProgressEvent::Skipped { .. } => {
                println!("File already downloaded (sizes match), skipping.");
            }
            ProgressEvent::SizeMismatch { local, remote, .. } => {
                println!(
                    "Local file size ({local} bytes) does not match remote size ({remote} bytes); re-downloading."
                );
            }
            ProgressEvent::ProbeFailed { url, reason } => {
                println!("HEAD request failed for {url}: {reason}");
            }
            ProgressEvent::LocalUnreadable { path, reason } => {
                println!("Cannot inspect {path}: {reason}; downloading again.");
            }
            ProgressEvent::Received { received, total } => self.draw_progress(received, total),
            ProgressEvent::Downloaded { file_name, bytes } => {
                self.end_progress();
                println!("Saved {file_name} ({})", bytes_to_human(bytes));
            }
            ProgressEvent::Failed { url, reason } => {
                self.end_progress();
                println!("Failed to download {url}: {reason}");
            }
            ProgressEvent::Finished { .. } => {}
        }
    }
}

fn redraw_line(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.queue(MoveToColumn(0))?;
    stdout.queue(Clear(ClearType::CurrentLine))?;
    stdout.write_all(line.as_bytes())?;
    stdout.flush()
}

pub fn progress_bar(percent: u8) -> String {
    let total = 20;
    let filled = (percent.min(100) as usize * total) / 100;
    let mut out = String::from("[");
    for i in 0..total {
        out.push(if i < filled { '#' } else { '.' });
    }
    out.push(']');
    out
}

pub fn bytes_to_human(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let value = bytes as f64;
    if value >= GB {
        format!("{:.1} GB", value / GB)
    } else if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{bytes} B")
    }
}
