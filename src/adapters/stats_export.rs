//! Stats table CSV export and cumulative-value SVG charts.

use crate::domain::error::OvernightError;
use crate::domain::stats::{fmt_stat, StatsReport, STAT_ROWS};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

fn csv_err(e: csv::Error) -> OvernightError {
    OvernightError::Io(std::io::Error::other(e))
}

/// Filesystem-safe filename fragment: problematic characters and whitespace
/// runs become underscores.
pub fn safe_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push('_');
            }
            last_was_space = true;
        } else if matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
            out.push('_');
            last_was_space = false;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Write the stats table as CSV: one row per statistic, one column per
/// return series. Undefined values render as `nan`.
pub fn write_stats_csv(path: &Path, report: &StatsReport) -> Result<(), OvernightError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

    let mut header = vec![report.title.clone()];
    header.extend(report.columns.iter().map(|(name, _)| name.clone()));
    writer.write_record(&header).map_err(csv_err)?;

    for (idx, label) in STAT_ROWS.iter().enumerate() {
        let mut record = vec![label.to_string()];
        for (_, stats) in &report.columns {
            record.push(fmt_stat(stats.values()[idx]));
        }
        writer.write_record(&record).map_err(csv_err)?;
    }

    writer.flush()?;
    Ok(())
}

const SVG_COLORS: [&str; 5] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"];

/// Render cumulative $1 series as an SVG line chart, one polyline per series.
pub fn render_cumulative_svg(title: &str, series: &[(String, Vec<(NaiveDate, f64)>)]) -> String {
    let width = 800.0;
    let height = 400.0;
    let padding = 50.0;

    let points: Vec<&(NaiveDate, f64)> = series.iter().flat_map(|(_, s)| s.iter()).collect();
    if points.is_empty() {
        return format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="20" y="30">No data to plot</text></svg>"#
        );
    }

    let min_date = points.iter().map(|(d, _)| *d).min().unwrap();
    let max_date = points.iter().map(|(d, _)| *d).max().unwrap();
    let min_value = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max_value = points
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);

    let plot_width = width - 2.0 * padding;
    let plot_height = height - 2.0 * padding;

    let date_span = (max_date - min_date).num_days().max(1) as f64;
    let value_range = max_value - min_value;
    let scale_y = if value_range > 0.0 {
        plot_height / value_range
    } else {
        1.0
    };

    // Axis colors contain `"#`, which would close an r#"..."# literal.
    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">
<rect width="{width}" height="{height}" fill="white"/>
<text x="{padding}" y="25" font-family="sans-serif" font-size="16">{title}</text>
<line x1="{padding}" y1="{y0}" x2="{x1}" y2="{y0}" stroke="#999"/>
<line x1="{padding}" y1="{padding}" x2="{padding}" y2="{y0}" stroke="#999"/>
"##,
        y0 = height - padding,
        x1 = width - padding,
    );

    for (idx, (name, values)) in series.iter().enumerate() {
        if values.is_empty() {
            continue;
        }
        let color = SVG_COLORS[idx % SVG_COLORS.len()];
        let polyline: Vec<String> = values
            .iter()
            .map(|(d, v)| {
                let x = padding + (*d - min_date).num_days() as f64 / date_span * plot_width;
                let y = height - padding - (v - min_value) * scale_y;
                format!("{x:.1},{y:.1}")
            })
            .collect();
        let final_value = values.last().map(|(_, v)| *v).unwrap_or(f64::NAN);
        svg.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"/>
<text x="{}" y="{}" font-family="sans-serif" font-size="12" fill="{}">{} (final={:.2})</text>
"#,
            polyline.join(" "),
            color,
            width - padding - 220.0,
            padding + 16.0 * idx as f64,
            color,
            name,
            final_value,
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

pub fn write_cumulative_svg(
    path: &Path,
    title: &str,
    series: &[(String, Vec<(NaiveDate, f64)>)],
) -> Result<(), OvernightError> {
    fs::write(path, render_cumulative_svg(title, series))?;
    Ok(())
}
