//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use tigomon_core::DeviceStatus;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status cell: green when producing, yellow when stale, dimmed when unknown.
pub fn paint_status(status: DeviceStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        DeviceStatus::Active => text.green().to_string(),
        DeviceStatus::Stale => text.yellow().to_string(),
        DeviceStatus::Unknown => text.dimmed().to_string(),
    }
}

/// Optional float with fixed precision, `-` when absent.
pub fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.precision$}"))
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    if compact {
        serde_json::to_string(data).expect("serialization should not fail")
    } else {
        serde_json::to_string_pretty(data).expect("serialization should not fail")
    }
}

/// YAML output.
fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        name: &'static str,
        watts: f64,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "Name")]
        name: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                name: "A1",
                watts: 248.1,
            },
            Item {
                name: "A2",
                watts: 0.0,
            },
        ]
    }

    fn row(i: &Item) -> ItemRow {
        ItemRow {
            name: i.name.into(),
        }
    }

    #[test]
    fn plain_emits_one_id_per_line() {
        let out = render_list(&OutputFormat::Plain, &items(), row, |i| i.name.into());
        assert_eq!(out, "A1\nA2");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(&OutputFormat::JsonCompact, &items(), row, |i| i.name.into());
        assert_eq!(out, r#"[{"name":"A1","watts":248.1},{"name":"A2","watts":0.0}]"#);
    }

    #[test]
    fn table_uses_rounded_style() {
        let out = render_list(&OutputFormat::Table, &items(), row, |i| i.name.into());
        assert!(out.contains("Name"));
        assert!(out.starts_with('╭'));
    }

    #[test]
    fn status_is_plain_without_color() {
        assert_eq!(paint_status(DeviceStatus::Stale, false), "stale");
        assert_eq!(fmt_opt(None, 1), "-");
        assert_eq!(fmt_opt(Some(35.204), 2), "35.20");
    }
}
