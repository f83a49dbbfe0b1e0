//! Colored formatter implementation with terminal color support
//!
//! Wraps the plain formatter's tables and lines with ANSI colors and
//! Unicode symbols.

use super::formatter::{
    event_line, format_mbps, format_ms, format_timestamp, FormattingOptions, OutputFormatter,
    PlainFormatter,
};
use super::recommendations::usage_recommendations;
use crate::{
    error::{AppError, Result},
    events::SessionEvent,
    models::{FinalResult, ServerCandidate, StabilityReport},
    stats::minute_breakdown,
    types::ConnectionQuality,
};
use colored::*;
use std::fmt::Write as _;

fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Display color for a quality rating
pub fn quality_color(quality: ConnectionQuality) -> Color {
    match quality {
        ConnectionQuality::Excellent => Color::Green,
        ConnectionQuality::Good => Color::Yellow,
        ConnectionQuality::Poor => Color::Red,
    }
}

fn quality_symbol(quality: ConnectionQuality) -> &'static str {
    match quality {
        ConnectionQuality::Excellent => "🚀",
        ConnectionQuality::Good => "⚡",
        ConnectionQuality::Poor => "⚠️",
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            highlight: Color::Magenta,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            plain_formatter: PlainFormatter::new(options.clone()),
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Bold and colored, or untouched when colors are off
    fn emphasize(&self, text: &str, color: Color) -> String {
        if self.options.enable_color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn rated(&self, quality: ConnectionQuality) -> String {
        let label = format!("{} {}", quality_symbol(quality), quality.as_str());
        self.emphasize(&label, quality_color(quality))
    }

    fn section_header(&self, title: &str, icon: &str) -> String {
        format!("{} {}", icon, self.emphasize(title, self.color_scheme.header))
    }

    /// Table borders dimmed, content untouched so column widths stay intact
    fn dim_borders(&self, table: &str) -> String {
        table
            .lines()
            .map(|line| {
                if line.starts_with('+') {
                    self.colorize(line, self.color_scheme.border).to_string()
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Color for a 0-100 stability score
    fn score_color(&self, score: f64) -> Color {
        if score >= 80.0 {
            self.color_scheme.success
        } else if score >= 50.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        }
    }

    fn colored_event(&self, event: &SessionEvent, line: String) -> String {
        match event {
            SessionEvent::Status { .. } => self.colorize(&line, self.color_scheme.muted).to_string(),
            SessionEvent::ClientInfo { .. } => format!("🌐 {}", self.colorize(&line, self.color_scheme.info)),
            SessionEvent::ServerSelected { .. } => {
                format!("📡 {}", self.colorize(&line, self.color_scheme.info))
            }
            SessionEvent::PingSample { ping, .. } => {
                let quality = ConnectionQuality::for_ping(*ping);
                self.colorize(&line, quality_color(quality)).to_string()
            }
            SessionEvent::DownloadComplete { download: value, .. }
            | SessionEvent::UploadComplete { upload: value, .. } => {
                let quality = ConnectionQuality::for_throughput(*value);
                self.emphasize(&line, quality_color(quality))
            }
            SessionEvent::DownloadProgress { .. } | SessionEvent::UploadProgress { .. } => {
                self.colorize(&line, self.color_scheme.muted).to_string()
            }
            SessionEvent::Error { .. } => format!("❌ {}", self.colorize(&line, self.color_scheme.error)),
            SessionEvent::ContinuousStarted { .. } => {
                format!("⏱️  {}", self.emphasize(&line, self.color_scheme.highlight))
            }
            SessionEvent::RunningStats { .. } => self.colorize(&line, self.color_scheme.highlight).to_string(),
            SessionEvent::TestStopped { .. } => format!("⏹️  {}", self.colorize(&line, self.color_scheme.warning)),
            SessionEvent::Final(_) | SessionEvent::Continuous(_) => line,
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();

        let decorated_title = format!("📊 {}", title);
        let border = "═".repeat(decorated_title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", self.emphasize(&decorated_title, self.color_scheme.header))
            .map_err(fmt_err)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_event(&self, event: &SessionEvent) -> Result<Option<String>> {
        match event {
            SessionEvent::Final(result) => self.format_final_result(result).map(Some),
            SessionEvent::Continuous(report) => self.format_stability_report(report).map(Some),
            other => Ok(event_line(other, self.options.verbose_mode).map(|line| self.colored_event(other, line))),
        }
    }

    fn format_final_result(&self, result: &FinalResult) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.format_header("Speed Test Results")?).map_err(fmt_err)?;
        writeln!(output, "{}", self.dim_borders(&self.plain_formatter.metrics_table(result)?))
            .map_err(fmt_err)?;
        writeln!(
            output,
            "📡 Server:    {} - {}",
            self.colorize(&result.server.sponsor, self.color_scheme.info),
            result.server.location()
        )
        .map_err(fmt_err)?;
        writeln!(
            output,
            "🕒 Tested at: {}",
            self.colorize(&format_timestamp(&result.timestamp), self.color_scheme.muted)
        )
        .map_err(fmt_err)?;
        writeln!(output, "🏆 Overall:   {}", self.rated(result.quality())).map_err(fmt_err)?;
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
        writeln!(output, "{}", self.dim_borders(&self.plain_formatter.report_table(report)?))
            .map_err(fmt_err)?;
        writeln!(
            output,
            "🧪 Tests:           {} over {} min",
            self.colorize(&report.test_count.to_string(), self.color_scheme.info),
            report.duration
        )
        .map_err(fmt_err)?;
        writeln!(output, "〰️  Average jitter:  {}", format_ms(report.avg_jitter)).map_err(fmt_err)?;
        let score = format!("{:.1}/100", report.stability_score);
        write!(
            output,
            "🎯 Stability score: {}",
            self.emphasize(&score, self.score_color(report.stability_score))
        )
        .map_err(fmt_err)?;

        let minutes = minute_breakdown(&report.results);
        if !minutes.is_empty() {
            writeln!(output).map_err(fmt_err)?;
            writeln!(output).map_err(fmt_err)?;
            writeln!(output, "{}", self.section_header("Minute-wise analysis", "🗓️ ")).map_err(fmt_err)?;
            let table = self.dim_borders(&self.plain_formatter.minute_table(&minutes)?);
            let table = table
                .replace(" UNSTABLE ", &format!(" {} ", self.colorize("UNSTABLE", self.color_scheme.error)))
                .replace("  STABLE  ", &format!("  {}  ", self.colorize("STABLE", self.color_scheme.success)));
            write!(output, "{}", table).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_server_list(&self, servers: &[ServerCandidate]) -> Result<String> {
        if servers.is_empty() {
            return Ok(self.colorize("No servers available.", self.color_scheme.muted).to_string());
        }

        let mut output = String::new();
        let title = format!("Available servers ({})", servers.len());
        writeln!(output, "{}", self.section_header(&title, "🖥️ ")).map_err(fmt_err)?;
        write!(output, "{}", self.dim_borders(&self.plain_formatter.server_table(servers)?)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_recommendations(&self, download: f64, upload: f64, ping: f64) -> Result<String> {
        let mut output = String::new();
        let ratings = [
            ConnectionQuality::for_throughput(download),
            ConnectionQuality::for_throughput(upload),
            ConnectionQuality::for_ping(ping),
        ];

        write!(output, "{}", self.section_header("Usage recommendations", "💡")).map_err(fmt_err)?;
        for (rec, quality) in usage_recommendations(download, upload, ping).into_iter().zip(ratings) {
            write!(
                output,
                "\n  • {}: {}",
                self.bold(rec.metric),
                self.colorize(rec.text, quality_color(quality))
            )
            .map_err(fmt_err)?;
        }

        if self.options.verbose_mode {
            write!(
                output,
                "\n  {}",
                self.colorize(
                    &format!("({} down, {} up, {})", format_mbps(download), format_mbps(upload), format_ms(ping)),
                    self.color_scheme.muted
                )
            )
            .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("❌ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("⚠️  {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✅ {}", self.colorize(message, self.color_scheme.success)))
    }
}
