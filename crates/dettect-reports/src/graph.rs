//! Growth graphs
//!
//! Cumulative count over time rendered as an SVG step chart: one step per
//! date on which data sources were connected or scores were recorded.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDate;

use dettect_core::model::ScoreDimension;
use dettect_store::admin::{DataSourceAdministration, TechniqueAdministration};

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 480.0;
const MARGIN: f64 = 60.0;

/// Cumulative count per date, in date order
pub fn cumulative(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<(NaiveDate, usize)> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in dates {
        *per_day.entry(date).or_default() += 1;
    }
    let mut total = 0;
    per_day
        .into_iter()
        .map(|(date, count)| {
            total += count;
            (date, total)
        })
        .collect()
}

/// Connection dates of the data sources available for analytics
pub fn data_source_dates(admin: &DataSourceAdministration) -> Vec<NaiveDate> {
    admin.available().filter_map(|ds| ds.connected_on()).collect()
}

/// Date each technique first reached a positive score in one dimension
pub fn technique_dates(
    admin: &TechniqueAdministration,
    dimension: ScoreDimension,
) -> Vec<NaiveDate> {
    admin
        .techniques
        .iter()
        .filter_map(|technique| {
            technique
                .objects(dimension)
                .iter()
                .flat_map(|o| o.score_logbook.iter())
                .filter(|e| e.score.is_some_and(|s| s > 0))
                .filter_map(|e| e.parsed_date())
                .min()
        })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render a step chart
pub fn step_chart(title: &str, y_label: &str, points: &[(NaiveDate, usize)]) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-family="sans-serif" font-size="18">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/><line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="black"/>"#,
        m = MARGIN,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN
    );
    let _ = writeln!(
        svg,
        r#"<text x="15" y="{}" font-family="sans-serif" font-size="12" transform="rotate(-90 15 {})">{}</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0,
        escape(y_label)
    );

    if let (Some(&(first, _)), Some(&(last, top))) = (points.first(), points.last()) {
        let span = (last - first).num_days().max(1) as f64;
        let scale = top.max(1) as f64;
        let x = |date: NaiveDate| {
            MARGIN + (date - first).num_days() as f64 / span * (WIDTH - 2.0 * MARGIN)
        };
        let y = |count: usize| HEIGHT - MARGIN - count as f64 / scale * (HEIGHT - 2.0 * MARGIN);

        let mut path = format!("M {:.1} {:.1}", x(first), y(0));
        for (date, count) in points {
            let _ = write!(path, " H {:.1} V {:.1}", x(*date), y(*count));
        }
        let _ = write!(path, " H {:.1}", WIDTH - MARGIN);
        let _ = writeln!(
            svg,
            r##"<path d="{}" fill="none" stroke="#3182bd" stroke-width="2"/>"##,
            path
        );

        for (date, anchor) in [(first, "start"), (last, "end")] {
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{}" text-anchor="{}" font-family="sans-serif" font-size="12">{}</text>"#,
                x(date),
                HEIGHT - MARGIN + 20.0,
                anchor,
                date
            );
        }
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" text-anchor="end" font-family="sans-serif" font-size="12">{}</text>"#,
            MARGIN - 5.0,
            y(top) + 4.0,
            top
        );
    }
    svg.push_str("</svg>\n");
    svg
}
