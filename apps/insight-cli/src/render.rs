//! Result views
//!
//! Both views are driven only by the [`ViewState`]: the table for wide
//! terminals and stacked cards for narrow ones. They show the same rows in
//! the same order.

use std::fmt::Write;

use anyhow::Result;
use inspection_core::{FetchStatus, ResultSet, ViewState, ViolationRecord};

/// Terminals narrower than this get cards under [`ViewFormat::Auto`]
pub const NARROW_COLUMNS: usize = 100;

const DESCRIPTION_WIDTH: usize = 48;
const CELL_WIDTH: usize = 28;

/// How to present a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewFormat {
    /// Pick table or cards from the terminal width
    #[default]
    Auto,
    Table,
    Cards,
    /// The result set as pretty-printed JSON
    Json,
}

impl ViewFormat {
    /// Resolve `Auto` against a terminal width
    pub fn resolve(self, columns: usize) -> Self {
        match self {
            ViewFormat::Auto if columns < NARROW_COLUMNS => ViewFormat::Cards,
            ViewFormat::Auto => ViewFormat::Table,
            other => other,
        }
    }
}

/// Terminal width from `COLUMNS`, defaulting to a wide terminal
pub fn terminal_columns() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse().ok())
        .unwrap_or(120)
}

/// Render the whole view: placeholder, error, or summary plus rows
pub fn render(view: &ViewState, format: ViewFormat) -> Result<String> {
    let format = format.resolve(terminal_columns());

    if format == ViewFormat::Json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(view)?));
    }

    let mut output = String::new();
    match &view.status {
        FetchStatus::Loading => {
            writeln!(output, "Loading violations...")?;
            return Ok(output);
        }
        FetchStatus::Failed(message) => {
            writeln!(output, "{}", message)?;
            return Ok(output);
        }
        FetchStatus::Fetching | FetchStatus::Ready => {}
    }

    write_summary(&mut output, view)?;

    if view.results.is_empty() {
        writeln!(output)?;
        writeln!(output, "No violations found")?;
        writeln!(output, "Try adjusting your search or filter")?;
        return Ok(output);
    }

    writeln!(output)?;
    match format {
        ViewFormat::Cards => write_cards(&mut output, &view.results)?,
        _ => write_table(&mut output, &view.results)?,
    }
    Ok(output)
}

fn write_summary(output: &mut String, view: &ViewState) -> Result<()> {
    writeln!(
        output,
        "Total Matching Violations: {}",
        format_count(view.results.total_count)
    )?;
    if view.status == FetchStatus::Fetching {
        writeln!(output, "Searching...")?;
    } else {
        writeln!(
            output,
            "Showing {} most recent violations",
            view.results.rows.len()
        )?;
    }
    Ok(())
}

/// Tabular view
pub fn write_table(output: &mut String, results: &ResultSet) -> Result<()> {
    const HEADERS: [&str; 7] = [
        "Restaurant Name",
        "Address",
        "City",
        "Violation",
        "Description",
        "Inspection Type",
        "Inspection Date",
    ];

    let cells: Vec<[String; 7]> = results.rows.iter().map(table_cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |output: &mut String, values: &[String]| -> Result<()> {
        let padded: Vec<String> = values
            .iter()
            .zip(widths.iter())
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect();
        writeln!(output, "{}", padded.join(" | ").trim_end())?;
        Ok(())
    };

    line(output, &HEADERS.map(String::from))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(output, "{}", rule.join("-+-"))?;
    for row in &cells {
        line(output, row)?;
    }
    Ok(())
}

fn table_cells(record: &ViolationRecord) -> [String; 7] {
    [
        truncate(&record.restaurant_name, CELL_WIDTH),
        truncate(&record.address, CELL_WIDTH),
        truncate(&record.city, CELL_WIDTH),
        record.violation_code.clone(),
        truncate(&record.violation_description, DESCRIPTION_WIDTH),
        record.inspection_type.clone().unwrap_or_default(),
        format_date(record),
    ]
}

/// Stacked-card view
pub fn write_cards(output: &mut String, results: &ResultSet) -> Result<()> {
    for record in &results.rows {
        writeln!(output, "┌ {}", record.restaurant_name)?;
        writeln!(output, "│ {}, {}", record.address, record.city)?;
        writeln!(output, "│ Violation: {}", record.violation_code)?;
        writeln!(output, "│ {}", record.violation_description)?;
        writeln!(
            output,
            "└ {}  {}",
            record.inspection_type.as_deref().unwrap_or("-"),
            format_date(record)
        )?;
        writeln!(output)?;
    }
    Ok(())
}

/// Thousands-separated count, e.g. `12,345`
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_date(record: &ViolationRecord) -> String {
    record.inspection_date.format("%-m/%-d/%Y").to_string()
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Print the static county map
pub fn render_counties() -> Result<String> {
    let mut output = String::new();
    for (county, cities) in inspection_core::DELAWARE_COUNTIES.iter() {
        writeln!(output, "{} ({} cities)", county, cities.len())?;
        for city in cities {
            writeln!(output, "  • {}", city)?;
        }
    }
    Ok(output)
}
