//! SVG rendering for the analysis plots.

use std::fmt::{self, Write};

use crate::pipeline::analyze::SentimentMatrix;

const FONT: &str = "font-family=\"sans-serif\"";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Maps a value domain onto a pixel range.
#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    lo: f64,
    hi: f64,
    start: f64,
    end: f64,
}

impl LinearScale {
    /// Domain always includes 0 so the reference line is on the chart.
    pub fn including_zero(values: &[f64], start: f64, end: f64) -> Self {
        let lo = values.iter().copied().fold(0.0_f64, f64::min);
        let hi = values.iter().copied().fold(0.0_f64, f64::max);
        let (lo, hi) = if (hi - lo).abs() < f64::EPSILON {
            (-1.0, 1.0)
        } else {
            (lo, hi)
        };
        Self { lo, hi, start, end }
    }

    pub fn map(&self, value: f64) -> f64 {
        self.start + (value - self.lo) / (self.hi - self.lo) * (self.end - self.start)
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

/// Diverging blue-grey-red ramp centred on 0, clamped to `[-1, 1]`.
fn diverging_color(value: f64) -> String {
    const COLD: (u8, u8, u8) = (59, 76, 192);
    const MID: (u8, u8, u8) = (221, 221, 221);
    const WARM: (u8, u8, u8) = (180, 4, 38);

    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (MID, COLD, -v)
    } else {
        (MID, WARM, v)
    };
    format!(
        "rgb({},{},{})",
        lerp(from.0, to.0, t),
        lerp(from.1, to.1, t),
        lerp(from.2, to.2, t)
    )
}

pub const BAR_LEFT: f64 = 220.0;
pub const BAR_RIGHT: f64 = 760.0;
const BAR_TOP: f64 = 60.0;
const BAR_HEIGHT: f64 = 28.0;
const BAR_GAP: f64 = 10.0;

fn bar_scale(ranking: &[(String, f64)]) -> LinearScale {
    let values: Vec<f64> = ranking.iter().map(|(_, v)| *v).collect();
    LinearScale::including_zero(&values, BAR_LEFT, BAR_RIGHT)
}

/// The pixel position of the zero reference line for a ranking.
pub fn zero_line_x(ranking: &[(String, f64)]) -> f64 {
    bar_scale(ranking).map(0.0)
}

/// Horizontal bars in ranking order (first entry on top) with a dashed
/// reference line at 0.
pub fn pain_barplot(ranking: &[(String, f64)]) -> Result<String, fmt::Error> {
    let scale = bar_scale(ranking);
    let zero = zero_line_x(ranking);
    let height = BAR_TOP + ranking.len() as f64 * (BAR_HEIGHT + BAR_GAP) + 60.0;

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"800\" height=\"{height}\" viewBox=\"0 0 800 {height}\">"
    )?;
    writeln!(svg, "<rect width=\"100%\" height=\"100%\" fill=\"white\"/>")?;
    writeln!(
        svg,
        "<text x=\"400\" y=\"30\" text-anchor=\"middle\" font-size=\"16\" font-weight=\"bold\" {FONT}>Mean pain index by source</text>"
    )?;

    for (i, (source, value)) in ranking.iter().enumerate() {
        let y = BAR_TOP + i as f64 * (BAR_HEIGHT + BAR_GAP);
        let x0 = scale.map(value.min(0.0));
        let x1 = scale.map(value.max(0.0));
        let fill = diverging_color(*value / 3.0);
        writeln!(
            svg,
            "<rect x=\"{x0:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{BAR_HEIGHT}\" fill=\"{fill}\"/>",
            x1 - x0
        )?;
        writeln!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"12\" {FONT}>{}</text>",
            BAR_LEFT - 8.0,
            y + BAR_HEIGHT / 2.0 + 4.0,
            escape(source)
        )?;
        writeln!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"11\" {FONT}>{value:.2}</text>",
            x1.max(zero) + 4.0,
            y + BAR_HEIGHT / 2.0 + 4.0
        )?;
    }

    writeln!(
        svg,
        "<line x1=\"{zero:.2}\" y1=\"{:.2}\" x2=\"{zero:.2}\" y2=\"{:.2}\" stroke=\"black\" stroke-width=\"1\" stroke-dasharray=\"6,4\"/>",
        BAR_TOP - 10.0,
        height - 40.0
    )?;
    writeln!(
        svg,
        "<text x=\"400\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"12\" {FONT}>Mean pain index (negative = pain, positive = opportunity)</text>",
        height - 15.0
    )?;
    svg.push_str("</svg>\n");
    Ok(svg)
}

const CELL_W: f64 = 110.0;
const CELL_H: f64 = 36.0;
const GRID_LEFT: f64 = 220.0;
const GRID_TOP: f64 = 60.0;

/// Source × label grid of mean sentiment. Absent combinations stay blank.
pub fn sentiment_heatmap(matrix: &SentimentMatrix) -> Result<String, fmt::Error> {
    let width = GRID_LEFT + matrix.labels.len() as f64 * CELL_W + 40.0;
    let height = GRID_TOP + matrix.sources.len() as f64 * CELL_H + 60.0;

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    )?;
    writeln!(svg, "<rect width=\"100%\" height=\"100%\" fill=\"white\"/>")?;
    writeln!(
        svg,
        "<text x=\"{:.2}\" y=\"30\" text-anchor=\"middle\" font-size=\"16\" font-weight=\"bold\" {FONT}>Mean sentiment by source and top label</text>",
        width / 2.0
    )?;

    for (col, label) in matrix.labels.iter().enumerate() {
        writeln!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"12\" {FONT}>{}</text>",
            GRID_LEFT + col as f64 * CELL_W + CELL_W / 2.0,
            GRID_TOP + matrix.sources.len() as f64 * CELL_H + 20.0,
            escape(label)
        )?;
    }

    for (row, source) in matrix.sources.iter().enumerate() {
        let y = GRID_TOP + row as f64 * CELL_H;
        writeln!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"12\" {FONT}>{}</text>",
            GRID_LEFT - 8.0,
            y + CELL_H / 2.0 + 4.0,
            escape(source)
        )?;
        for (col, label) in matrix.labels.iter().enumerate() {
            let Some(value) = matrix.get(source, label) else {
                continue;
            };
            let x = GRID_LEFT + col as f64 * CELL_W;
            writeln!(
                svg,
                "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{CELL_W}\" height=\"{CELL_H}\" fill=\"{}\" stroke=\"white\" stroke-width=\"0.5\"/>",
                diverging_color(value)
            )?;
            writeln!(
                svg,
                "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"12\" {FONT}>{value:.2}</text>",
                x + CELL_W / 2.0,
                y + CELL_H / 2.0 + 4.0
            )?;
        }
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_zero_line_position() {
        let ranking = vec![("a".to_string(), -2.0), ("b".to_string(), 1.0)];
        let zero = zero_line_x(&ranking);
        // Domain [-2, 1] over 540px puts zero two thirds of the way across.
        assert!((zero - (BAR_LEFT + 360.0)).abs() < 1e-9);

        let svg = pain_barplot(&ranking).unwrap();
        assert!(svg.contains(&format!("<line x1=\"{zero:.2}\"")));
        assert!(svg.find(">a<").unwrap() < svg.find(">b<").unwrap());
    }

    #[test]
    fn test_zero_line_all_positive() {
        let ranking = vec![("a".to_string(), 1.0), ("b".to_string(), 3.0)];
        assert!((zero_line_x(&ranking) - BAR_LEFT).abs() < 1e-9);
    }

    #[test]
    fn test_flat_domain_centres_zero() {
        let ranking = vec![("a".to_string(), 0.0)];
        assert!((zero_line_x(&ranking) - (BAR_LEFT + BAR_RIGHT) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_heatmap_leaves_absent_cells_blank() {
        let mut cells = BTreeMap::new();
        cells.insert(("alpha".to_string(), "bug".to_string()), -0.5);
        let matrix = SentimentMatrix {
            labels: vec!["bug".to_string(), "docs".to_string()],
            sources: vec!["alpha".to_string(), "beta".to_string()],
            cells,
        };
        let svg = sentiment_heatmap(&matrix).unwrap();
        assert_eq!(svg.matches(" fill=\"rgb(").count(), 1);
        assert!(svg.contains(">-0.50<"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let ranking = vec![("a<b>&c".to_string(), -1.0)];
        let svg = pain_barplot(&ranking).unwrap();
        assert!(svg.contains("a&lt;b&gt;&amp;c"));
    }
}
