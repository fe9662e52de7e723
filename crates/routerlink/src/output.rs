//! Output formatting: JSON, compact JSON, YAML.

use std::io::{self, Write};

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render any serializable value in the chosen format.
pub fn render<T: Serialize + ?Sized>(format: OutputFormat, data: &T) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).map_err(render_err)?,
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(render_err)?,
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(render_err)?,
    };
    Ok(rendered)
}

/// Render and write to stdout, one value per line.
pub fn print<T: Serialize + ?Sized>(format: OutputFormat, data: &T) -> Result<(), CliError> {
    let text = render(format, data)?;
    let mut out = io::stdout().lock();
    if text.ends_with('\n') {
        write!(out, "{text}")?;
    } else {
        writeln!(out, "{text}")?;
    }
    Ok(())
}

fn render_err(err: impl std::fmt::Display) -> CliError {
    CliError::Render(err.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn formats_differ_only_in_layout() {
        let value = json!({"name": "edge", "cpu": 12});

        let compact = render(OutputFormat::JsonCompact, &value).unwrap();
        assert!(!compact.contains('\n'));

        let pretty = render(OutputFormat::Json, &value).unwrap();
        assert!(pretty.contains("\n  \"cpu\": 12"));

        let yaml = render(OutputFormat::Yaml, &value).unwrap();
        assert!(yaml.contains("name: edge"));
    }
}
