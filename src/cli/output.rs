//! Output formatting for CLI commands

use anyhow::Result;

use crate::domain::Object;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
///
/// Status messages go through the logger; this only prints data.
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints an object as a YAML document or a single JSON line
    pub fn object(&self, object: &Object) -> Result<()> {
        println!("{}", self.render(object)?);
        Ok(())
    }

    /// Renders an object in the selected format
    pub fn render(&self, object: &Object) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Text => object.to_yaml_document()?.trim_end().to_string(),
            OutputFormat::Json => serde_json::to_string(object)?,
        })
    }
}
