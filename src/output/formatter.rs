//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use super::recommendations::usage_recommendations;
use crate::{
    error::{AppError, Result},
    events::SessionEvent,
    models::{FinalResult, MinuteStats, ServerCandidate, StabilityReport},
    stats::minute_breakdown,
    types::ConnectionQuality,
};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// Display format for result timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format one session event as it arrives; `None` hides the event
    fn format_event(&self, event: &SessionEvent) -> Result<Option<String>>;

    /// Summary of one completed pass
    fn format_final_result(&self, result: &FinalResult) -> Result<String>;

    /// Summary of a continuous session
    fn format_stability_report(&self, report: &StabilityReport) -> Result<String>;

    /// Candidate server table
    fn format_server_list(&self, servers: &[ServerCandidate]) -> Result<String>;

    /// Usage recommendations for the measured throughput and latency
    fn format_recommendations(&self, download: f64, upload: f64, ping: f64) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show every progress sample, not only completed phases
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum cell width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 48,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
    /// Minimum width for columns without a definition
    pub min_column_width: usize,
    /// Maximum width for columns without a definition
    pub max_column_width: usize,
}

impl TableFormat {
    /// Bordered table with a header row
    pub fn with_columns(columns: Vec<Column>, show_borders: bool, max_width: usize) -> Self {
        Self {
            columns,
            show_borders,
            show_header: true,
            min_column_width: 4,
            max_column_width: max_width,
        }
    }
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Minimum width
    pub min_width: usize,
    /// Maximum width
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width: header.chars().count(),
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

pub(crate) fn format_mbps(value: f64) -> String {
    format!("{:.2} Mbps", value)
}

pub(crate) fn format_ms(value: f64) -> String {
    format!("{:.1} ms", value)
}

pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Human-readable line for every event except the terminal summaries
pub(crate) fn event_line(event: &SessionEvent, verbose: bool) -> Option<String> {
    let line = match event {
        SessionEvent::ClientInfo { info, .. } => {
            format!("Client: {} ({}, {})", info.ip, info.isp, info.country)
        }
        SessionEvent::Status { message, .. } => message.clone(),
        SessionEvent::ServerSelected { server, .. } => {
            let mut line = format!(
                "Server: {} - {} ({:.1} km)",
                server.sponsor,
                server.location(),
                server.distance
            );
            if let Some(latency) = server.latency {
                let _ = write!(line, ", probe {}", format_ms(latency));
            }
            line
        }
        SessionEvent::PingSample { ping, sample, .. } => {
            format!("Ping #{}: {}", sample, format_ms(*ping))
        }
        SessionEvent::DownloadProgress { download, .. } => {
            if !verbose {
                return None;
            }
            format!("  download {}", format_mbps(*download))
        }
        SessionEvent::DownloadComplete { download, .. } => {
            format!("Download: {}", format_mbps(*download))
        }
        SessionEvent::UploadProgress { upload, .. } => {
            if !verbose {
                return None;
            }
            format!("  upload {}", format_mbps(*upload))
        }
        SessionEvent::UploadComplete { upload, .. } => {
            format!("Upload: {}", format_mbps(*upload))
        }
        SessionEvent::Error { message, .. } => format!("Error: {}", message),
        SessionEvent::ContinuousStarted { duration_minutes, .. } => {
            format!("Continuous test started ({} min)", duration_minutes)
        }
        SessionEvent::RunningStats { stats, progress, .. } => format!(
            "[{:>3}%] {} tests | download avg {} | upload avg {} | ping avg {}",
            progress,
            stats.count,
            format_mbps(stats.download.avg),
            format_mbps(stats.upload.avg),
            format_ms(stats.ping.avg)
        ),
        SessionEvent::TestStopped { .. } => "Test stopped".to_string(),
        SessionEvent::Final(_) | SessionEvent::Continuous(_) => return None,
    };
    Some(line)
}

fn range_cell(avg: String, min: String, max: String) -> String {
    format!("{} ({} - {})", avg, min, max)
}

/// Rows of the per-minute breakdown table
pub(crate) fn minute_rows(minutes: &[MinuteStats]) -> Vec<RowData> {
    minutes
        .iter()
        .map(|m| {
            vec![
                format!("{}:00", m.minute),
                m.tests.to_string(),
                range_cell(
                    format!("{:.1}", m.download.avg),
                    format!("{:.1}", m.download.min),
                    format!("{:.1}", m.download.max),
                ),
                range_cell(
                    format!("{:.1}", m.upload.avg),
                    format!("{:.1}", m.upload.min),
                    format!("{:.1}", m.upload.max),
                ),
                range_cell(
                    format!("{:.0}", m.ping.avg),
                    format!("{:.0}", m.ping.min),
                    format!("{:.0}", m.ping.max),
                ),
                if m.is_stable() { "STABLE" } else { "UNSTABLE" }.to_string(),
            ]
        })
        .collect()
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub(crate) fn metrics_table(&self, result: &FinalResult) -> Result<String> {
        let format = TableFormat::with_columns(
            vec![
                Column::new("Metric", Alignment::Left, 12),
                Column::new("Value", Alignment::Right, 16),
                Column::new("Quality", Alignment::Center, 10),
            ],
            self.options.table_borders,
            self.options.max_width,
        );
        let rows = vec![
            vec![
                "Ping".to_string(),
                format_ms(result.ping),
                ConnectionQuality::for_ping(result.ping).as_str().to_string(),
            ],
            vec!["Jitter".to_string(), format_ms(result.jitter), String::new()],
            vec![
                "Download".to_string(),
                format_mbps(result.download),
                ConnectionQuality::for_throughput(result.download).as_str().to_string(),
            ],
            vec![
                "Upload".to_string(),
                format_mbps(result.upload),
                ConnectionQuality::for_throughput(result.upload).as_str().to_string(),
            ],
        ];
        self.create_table(&format, &rows)
    }

    pub(crate) fn report_table(&self, report: &StabilityReport) -> Result<String> {
        let format = TableFormat::with_columns(
            vec![
                Column::new("Metric", Alignment::Left, 10),
                Column::new("Average", Alignment::Right, 14),
                Column::new("Min", Alignment::Right, 14),
                Column::new("Max", Alignment::Right, 14),
                Column::new("Std Dev", Alignment::Right, 10),
                Column::new("Quality", Alignment::Center, 10),
            ],
            self.options.table_borders,
            self.options.max_width,
        );
        let rows = vec![
            vec![
                "Download".to_string(),
                format_mbps(report.avg_download),
                format_mbps(report.min_download),
                format_mbps(report.max_download),
                format!("{:.2}", report.download_stdev),
                report.download_quality().as_str().to_string(),
            ],
            vec![
                "Upload".to_string(),
                format_mbps(report.avg_upload),
                format_mbps(report.min_upload),
                format_mbps(report.max_upload),
                format!("{:.2}", report.upload_stdev),
                report.upload_quality().as_str().to_string(),
            ],
            vec![
                "Ping".to_string(),
                format_ms(report.avg_ping),
                format_ms(report.min_ping),
                format_ms(report.max_ping),
                format!("{:.2}", report.ping_stdev),
                report.ping_quality().as_str().to_string(),
            ],
        ];
        self.create_table(&format, &rows)
    }

    pub(crate) fn minute_table(&self, minutes: &[MinuteStats]) -> Result<String> {
        let format = TableFormat::with_columns(
            vec![
                Column::new("Minute", Alignment::Left, 8),
                Column::new("Tests", Alignment::Right, 6),
                Column::new("Download", Alignment::Center, 24),
                Column::new("Upload", Alignment::Center, 24),
                Column::new("Ping", Alignment::Center, 16),
                Column::new("Quality", Alignment::Center, 10),
            ],
            self.options.table_borders,
            self.options.max_width,
        );
        self.create_table(&format, &minute_rows(minutes))
    }

    pub(crate) fn server_table(&self, servers: &[ServerCandidate]) -> Result<String> {
        let format = TableFormat::with_columns(
            vec![
                Column::new("ID", Alignment::Left, 16),
                Column::new("Sponsor", Alignment::Left, 28),
                Column::new("Location", Alignment::Left, 32),
                Column::new("Distance", Alignment::Right, 12),
            ],
            self.options.table_borders,
            self.options.max_width,
        );
        let rows: Vec<RowData> = servers
            .iter()
            .map(|s| {
                vec![
                    s.id.clone(),
                    s.sponsor.clone(),
                    s.location(),
                    format!("{:.1} km", s.distance),
                ]
            })
            .collect();
        self.create_table(&format, &rows)
    }

    /// Create a table with the given format and data
    pub(crate) fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> Result<String> {
        if rows.is_empty() {
            return Ok(String::new());
        }

        let column_widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                writeln!(output, "{}", self.create_horizontal_border(&column_widths)).map_err(fmt_err)?;
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            writeln!(output, "{}", self.create_row(&headers, &column_widths, format)).map_err(fmt_err)?;

            if format.show_borders {
                writeln!(output, "{}", self.create_horizontal_border(&column_widths)).map_err(fmt_err)?;
            }
        }

        for row in rows {
            writeln!(output, "{}", self.create_row(row, &column_widths, format)).map_err(fmt_err)?;
        }

        if format.show_borders {
            write!(output, "{}", self.create_horizontal_border(&column_widths)).map_err(fmt_err)?;
        }

        Ok(output.trim_end_matches('\n').to_string())
    }

    /// Width of each column: widest cell, clamped to the column's bounds
    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        let num_columns = format
            .columns
            .len()
            .max(rows.iter().map(|r| r.len()).max().unwrap_or(0));

        (0..num_columns)
            .map(|idx| {
                let column = format.columns.get(idx);
                let floor = column
                    .map(|c| c.min_width.max(c.header.chars().count()))
                    .unwrap_or(format.min_column_width);
                let content = rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0);
                let ceiling = column.map(|c| c.max_width).unwrap_or(format.max_column_width);
                floor.max(content).min(ceiling)
            })
            .collect()
    }

    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format
                .columns
                .get(idx)
                .map(|c| &c.alignment)
                .unwrap_or(&Alignment::Left);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&self.align_text(cell, width, alignment));
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    /// Pad or truncate `text` to exactly `width` characters
    fn align_text(&self, text: &str, width: usize, alignment: &Alignment) -> String {
        let len = text.chars().count();
        if len >= width {
            return text.chars().take(width).collect();
        }

        let padding = width - len;
        match alignment {
            Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
            Alignment::Right => format!("{}{}", " ".repeat(padding), text),
            Alignment::Center => {
                let left_pad = padding / 2;
                let right_pad = padding - left_pad;
                format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
            }
        }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.chars().count() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_event(&self, event: &SessionEvent) -> Result<Option<String>> {
        match event {
            SessionEvent::Final(result) => self.format_final_result(result).map(Some),
            SessionEvent::Continuous(report) => self.format_stability_report(report).map(Some),
            other => Ok(event_line(other, self.options.verbose_mode)),
        }
    }

    fn format_final_result(&self, result: &FinalResult) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.format_header("Speed Test Results")?).map_err(fmt_err)?;
        writeln!(output, "{}", self.metrics_table(result)?).map_err(fmt_err)?;
        writeln!(output, "Server:    {} - {}", result.server.sponsor, result.server.location())
            .map_err(fmt_err)?;
        writeln!(output, "Tested at: {}", format_timestamp(&result.timestamp)).map_err(fmt_err)?;
        writeln!(output, "Overall:   {}", result.quality().as_str()).map_err(fmt_err)?;
        writeln!(output).map_err(fmt_err)?;
        write!(
            output,
            "{}",
            self.format_recommendations(result.download, result.upload, result.ping)?
        )
        .map_err(fmt_err)?;

        Ok(output)
    }

    fn format_stability_report(&self, report: &StabilityReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.format_header("Stability Report")?).map_err(fmt_err)?;
        writeln!(output, "{}", self.report_table(report)?).map_err(fmt_err)?;
        writeln!(output, "Tests:           {} over {} min", report.test_count, report.duration)
            .map_err(fmt_err)?;
        writeln!(output, "Average jitter:  {}", format_ms(report.avg_jitter)).map_err(fmt_err)?;
        write!(output, "Stability score: {:.1}/100", report.stability_score).map_err(fmt_err)?;

        let minutes = minute_breakdown(&report.results);
        if !minutes.is_empty() {
            writeln!(output).map_err(fmt_err)?;
            writeln!(output).map_err(fmt_err)?;
            writeln!(output, "Minute-wise analysis:").map_err(fmt_err)?;
            write!(output, "{}", self.minute_table(&minutes)?).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_server_list(&self, servers: &[ServerCandidate]) -> Result<String> {
        if servers.is_empty() {
            return Ok("No servers available.".to_string());
        }

        let mut output = String::new();
        writeln!(output, "Available servers ({}):", servers.len()).map_err(fmt_err)?;
        write!(output, "{}", self.server_table(servers)?).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_recommendations(&self, download: f64, upload: f64, ping: f64) -> Result<String> {
        let mut output = String::new();

        write!(output, "Usage recommendations:").map_err(fmt_err)?;
        for rec in usage_recommendations(download, upload, ping) {
            write!(output, "\n  - {}: {}", rec.metric, rec.text).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
