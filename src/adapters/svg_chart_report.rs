//! SVG chart of the portfolio series: stock, cash and total AUM as three
//! stacked line panels sharing the date axis.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::portfolio::PortfolioSeries;
use crate::ports::report_port::ReportPort;

const WIDTH: f64 = 800.0;
const PADDING: f64 = 50.0;
const PANEL_GAP: f64 = 30.0;

struct Panel<'a> {
    title: &'a str,
    height: f64,
    values: Vec<f64>,
    /// Anchor the y axis at zero instead of the series minimum.
    zero_based: bool,
}

fn polyline(values: &[f64], top: f64, height: f64, zero_based: bool) -> String {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = if zero_based {
        finite.clone().fold(0.0, f64::min)
    } else {
        finite.clone().fold(f64::INFINITY, f64::min)
    };
    let max = finite.fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { height / range } else { 0.0 };
    let scale_x = if values.len() > 1 {
        plot_width / (values.len() - 1) as f64
    } else {
        0.0
    };
    // flat series sit in the middle of the panel
    let flat_offset = if range > 0.0 { 0.0 } else { height / 2.0 };

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| {
            let x = PADDING + i as f64 * scale_x;
            let y = top + height - flat_offset - (v - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_chart(series: &PortfolioSeries) -> String {
    let panels = [
        Panel {
            title: "Stock",
            height: 80.0,
            values: series.stock(),
            zero_based: true,
        },
        Panel {
            title: "Cash",
            height: 80.0,
            values: series.cash(),
            zero_based: true,
        },
        Panel {
            title: "Total Assets",
            height: 160.0,
            values: series.total_aum(),
            zero_based: false,
        },
    ];

    let total_height = 2.0 * PADDING
        + panels.iter().map(|p| p.height).sum::<f64>()
        + PANEL_GAP * (panels.len() - 1) as f64;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{x:.0}" y="{y:.0}" font-family="sans-serif" font-size="16">Assets Under Management</text>
"#,
        w = WIDTH,
        h = total_height,
        x = PADDING,
        y = PADDING / 2.0,
    );

    let mut top = PADDING;
    for panel in &panels {
        let bottom = top + panel.height;
        svg.push_str(&format!(
            r##"<text x="{x:.0}" y="{ty:.0}" font-family="sans-serif" font-size="11">{title}</text>
<line x1="{x:.0}" y1="{top:.0}" x2="{x:.0}" y2="{bottom:.0}" stroke="#888"/>
<line x1="{x:.0}" y1="{bottom:.0}" x2="{right:.0}" y2="{bottom:.0}" stroke="#888"/>
<polyline fill="none" stroke="steelblue" stroke-width="1.5" points="{points}"/>
"##,
            x = PADDING,
            ty = top - 4.0,
            title = panel.title,
            top = top,
            bottom = bottom,
            right = WIDTH - PADDING,
            points = polyline(&panel.values, top, panel.height, panel.zero_based),
        ));
        top = bottom + PANEL_GAP;
    }

    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        let y = top - PANEL_GAP + 16.0;
        svg.push_str(&format!(
            r#"<text x="{l:.0}" y="{y:.0}" font-family="sans-serif" font-size="10">{first}</text>
<text x="{r:.0}" y="{y:.0}" font-family="sans-serif" font-size="10" text-anchor="end">{last}</text>
"#,
            l = PADDING,
            r = WIDTH - PADDING,
            y = y,
            first = first.date,
            last = last.date,
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SvgChartReport;

impl ReportPort for SvgChartReport {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError> {
        if result.portfolio.is_empty() {
            return Err(BacktestError::Report {
                reason: "no portfolio data to chart".into(),
            });
        }
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, render_chart(&result.portfolio))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[(f64, f64)]) -> PortfolioSeries {
        let mut s = PortfolioSeries::new();
        for (i, (cash, stock)) in values.iter().enumerate() {
            s.record(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                *cash,
                *stock,
            );
        }
        s
    }

    #[test]
    fn renders_three_panels() {
        let svg = render_chart(&series(&[(1000.0, 0.0), (500.0, 520.0), (500.0, 620.0)]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert!(svg.contains(">Stock<"));
        assert!(svg.contains(">Cash<"));
        assert!(svg.contains(">Total Assets<"));
        assert!(svg.contains("2024-01-01"));
        assert!(svg.contains("2024-01-03"));
    }

    #[test]
    fn polyline_spans_plot_width() {
        let points = polyline(&[1.0, 2.0, 3.0], 0.0, 100.0, false);
        let coords: Vec<&str> = points.split(' ').collect();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0], "50.0,100.0");
        assert_eq!(coords[2], "750.0,0.0");
    }

    #[test]
    fn flat_series_is_centred() {
        let points = polyline(&[5.0, 5.0], 0.0, 100.0, false);
        assert_eq!(points, "50.0,50.0 750.0,50.0");
    }

    #[test]
    fn non_finite_points_skipped() {
        let points = polyline(&[1.0, f64::NAN, 3.0], 0.0, 100.0, false);
        assert_eq!(points.split(' ').count(), 2);
    }
}
