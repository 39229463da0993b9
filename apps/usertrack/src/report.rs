use std::fmt::Write as _;

use crate::store::WeeklyCount;
use crate::week::IsoWeek;

/// Columns available to the widest bar.
pub const GRAPH_WIDTH: f64 = 52.0;

/// Relative change from `before` to `after`, in percent. Zero when there is
/// no baseline to compare against.
pub fn percent_change(before: i64, after: i64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (after - before) as f64 / before as f64 * 100.0
}

fn direction(percent: f64) -> &'static str {
    if percent < 0.0 { "down" } else { "up" }
}

pub fn count_report(week: IsoWeek, count: i64, previous: Option<i64>) -> String {
    let mut text = format!("User count in week {week}: {count}");
    if let Some(previous) = previous {
        let percent = percent_change(previous, count);
        let _ = write!(
            text,
            " ({} {percent:.2}%) (last week: {previous})",
            direction(percent)
        );
    }
    text
}

/// Code-fenced bar chart of `samples` (oldest first) with per-week change and
/// a summary footer.
pub fn growth_graph(samples: &[WeeklyCount]) -> String {
    let min = samples.iter().map(|s| s.count).min().unwrap_or(0);
    let max = samples.iter().map(|s| s.count).max().unwrap_or(0);
    let span = (max - min) as f64;

    let mut out = String::from("```");
    let mut last: Option<i64> = None;
    let mut total_change = 0i64;
    let mut percent_sum = 0f64;

    for sample in samples {
        let scaled = if span > 0.0 {
            (sample.count - min) as f64 / span
        } else {
            0.0
        };
        let width = (scaled * GRAPH_WIDTH) as usize;
        let _ = write!(
            out,
            "Y{}W{:02}: {} ({}) ",
            sample.week.year,
            sample.week.week,
            "#".repeat(width + 1),
            sample.count
        );

        if let Some(previous) = last {
            total_change += sample.count - previous;
            let percent = percent_change(previous, sample.count);
            percent_sum += percent;
            let _ = write!(out, "{} {percent:.2}%", direction(percent));
        }
        last = Some(sample.count);
        out.push('\n');
    }

    let steps = samples.len().saturating_sub(1);
    let (avg, avg_percent) = if steps == 0 {
        (0, 0.0)
    } else {
        (total_change / steps as i64, percent_sum / steps as f64)
    };
    let _ = write!(
        out,
        "total change: {total_change} avg: {avg} avg_p: {avg_percent:.2}```"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(week: u8, count: i64) -> WeeklyCount {
        WeeklyCount {
            week: IsoWeek::new(2024, week),
            count,
        }
    }

    #[test]
    fn count_report_compares_with_last_week() {
        let week = IsoWeek::new(2024, 11);
        assert_eq!(
            count_report(week, 110, Some(100)),
            "User count in week 11 2024: 110 (up 10.00%) (last week: 100)"
        );
        assert_eq!(
            count_report(week, 90, Some(100)),
            "User count in week 11 2024: 90 (down -10.00%) (last week: 100)"
        );
        assert_eq!(count_report(week, 90, None), "User count in week 11 2024: 90");
    }

    #[test]
    fn graph_scales_bars_between_min_and_max() {
        let graph = growth_graph(&[sample(1, 100), sample(2, 200), sample(3, 150)]);
        let lines: Vec<&str> = graph.lines().collect();
        assert_eq!(lines[0], "```Y2024W01: # (100) ");
        assert_eq!(lines[1], format!("Y2024W02: {} (200) up 100.00%", "#".repeat(53)));
        assert_eq!(lines[2], format!("Y2024W03: {} (150) down -25.00%", "#".repeat(27)));
        assert_eq!(lines[3], "total change: 50 avg: 25 avg_p: 37.50```");
    }

    #[test]
    fn flat_or_single_histories_do_not_divide_by_zero() {
        assert_eq!(
            growth_graph(&[sample(5, 10)]),
            "```Y2024W05: # (10) \ntotal change: 0 avg: 0 avg_p: 0.00```"
        );
        let flat = growth_graph(&[sample(5, 10), sample(6, 10)]);
        assert!(flat.contains("Y2024W06: # (10) up 0.00%\n"));
        assert_eq!(growth_graph(&[]), "```total change: 0 avg: 0 avg_p: 0.00```");
    }
}
