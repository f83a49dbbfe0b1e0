//! Output formatting and display system
//!
//! Session events are rendered either as human-readable lines with summary
//! tables (colored or plain) or as one JSON object per line.

mod colored;
mod formatter;
mod recommendations;

pub use colored::{quality_color, ColorScheme, ColoredFormatter};
pub use formatter::{
    Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat,
    TIMESTAMP_FORMAT,
};
pub use recommendations::{usage_recommendations, Recommendation};

use crate::{error::Result, events::SessionEvent, models::ServerCandidate};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..FormattingOptions::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Main output coordinator that turns events into printable text
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    json: bool,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>, json: bool) -> Self {
        Self { formatter, json }
    }

    /// Coordinator configured from the display flags
    pub fn from_flags(enable_color: bool, verbose: bool, json: bool) -> Self {
        let formatter = OutputFormatterFactory::create_formatter(enable_color && !json, verbose);
        Self::new(formatter, json)
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Text for one event; `None` when the event is not shown
    pub fn render_event(&self, event: &SessionEvent) -> Result<Option<String>> {
        if self.json {
            return event.to_json().map(Some);
        }
        self.formatter.format_event(event)
    }

    /// Server listing, as a table or as a `servers_list` JSON object
    pub fn render_server_list(&self, servers: &[ServerCandidate]) -> Result<String> {
        if self.json {
            let payload = serde_json::json!({
                "type": "servers_list",
                "servers": servers,
            });
            return Ok(serde_json::to_string(&payload)?);
        }
        self.formatter.format_server_list(servers)
    }

    /// Failure of a server listing, mirroring `render_server_list`
    pub fn render_server_list_error(&self, message: &str) -> Result<String> {
        if self.json {
            let payload = serde_json::json!({
                "type": "servers_error",
                "error": message,
            });
            return Ok(serde_json::to_string(&payload)?);
        }
        self.formatter.format_error(message)
    }

    pub fn render_warning(&self, message: &str) -> Result<String> {
        self.formatter.format_warning(message)
    }
}
