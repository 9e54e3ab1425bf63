//! Output formatting module

use std::io::Write;

use serde::Serialize;
use truck_lci_app::app::CalculationOutput;
use truck_lci_domain::model::{ActivityKey, CoercionDiagnostic, ResultRecord};
use truck_lci_types::{FunctionalUnit, OutputFormat, Result};

/// Diagnostics listed in the table footer before truncating
const MAX_LISTED: usize = 10;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    functional_unit: FunctionalUnit,
    samples: usize,
    results: Vec<ResultRecord>,
    unclaimed: &'a [ActivityKey],
    missing: &'a [String],
    coercions: &'a [CoercionDiagnostic],
}

pub fn write_output<W: Write>(
    w: &mut W,
    output_format: OutputFormat,
    output: &CalculationOutput,
) -> Result<()> {
    let records = output.results.records();
    match output_format {
        OutputFormat::Json => {
            let report = JsonReport {
                functional_unit: output.results.functional_unit(),
                samples: output.results.samples(),
                results: records,
                unclaimed: &output.unclaimed,
                missing: &output.missing,
                coercions: &output.coercions,
            };
            serde_json::to_writer_pretty(&mut *w, &report)?;
            writeln!(w)?;
        }
        OutputFormat::Table => {
            write_table(
                w,
                output.results.impact_categories(),
                output.results.functional_unit(),
                &records,
            )?;
            write_diagnostics(w, output)?;
        }
    }
    Ok(())
}

/// One block per impact category, one row per vehicle and result category,
/// closed by the vehicle total
fn write_table<W: Write>(
    w: &mut W,
    impact_categories: &[String],
    unit: FunctionalUnit,
    records: &[ResultRecord],
) -> Result<()> {
    if records.is_empty() {
        writeln!(w, "No results: every vehicle was excluded or contributed nothing")?;
        return Ok(());
    }

    for impact in impact_categories {
        let rows: Vec<&ResultRecord> = records
            .iter()
            .filter(|r| &r.impact_category == impact)
            .collect();
        if rows.is_empty() {
            continue;
        }

        let title = format!("{} (per {})", impact, unit);
        writeln!(w)?;
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", "=".repeat(title.chars().count()))?;
        writeln!(
            w,
            "{:<6} {:<10} {:>4}  {:<22} {:>12}",
            "Size", "Powertrain", "Year", "Category", "Value"
        )?;

        let mut start = 0;
        while start < rows.len() {
            let head = rows[start];
            let end = rows[start..]
                .iter()
                .position(|r| (r.size, r.powertrain, r.year) != (head.size, head.powertrain, head.year))
                .map_or(rows.len(), |offset| start + offset);
            let mut total = 0.0;
            for row in &rows[start..end] {
                total += row.value;
                writeln!(
                    w,
                    "{:<6} {:<10} {:>4}  {:<22} {:>12.4e}",
                    row.size.label(),
                    row.powertrain.label(),
                    row.year,
                    row.result_category,
                    row.value
                )?;
            }
            writeln!(
                w,
                "{:<6} {:<10} {:>4}  {:<22} {:>12.4e}",
                head.size.label(),
                head.powertrain.label(),
                head.year,
                "total",
                total
            )?;
            start = end;
        }
    }
    Ok(())
}

fn write_diagnostics<W: Write>(w: &mut W, output: &CalculationOutput) -> Result<()> {
    if !output.unclaimed.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} first-tier activities without result category (not counted):",
            output.unclaimed.len()
        )?;
        for key in output.unclaimed.iter().take(MAX_LISTED) {
            writeln!(w, "  {}", key)?;
        }
        if output.unclaimed.len() > MAX_LISTED {
            writeln!(w, "  ... and {} more", output.unclaimed.len() - MAX_LISTED)?;
        }
    }
    if !output.missing.is_empty() {
        writeln!(w)?;
        writeln!(w, "Reference datasets not found:")?;
        for name in output.missing.iter().take(MAX_LISTED) {
            writeln!(w, "  {}", name)?;
        }
    }
    if !output.coercions.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} non-finite matrix coefficients replaced by zero",
            output.coercions.len()
        )?;
    }
    Ok(())
}
