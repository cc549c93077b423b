//! Text bar charts drawn with ratatui into an off-screen buffer.

use ratatui::buffer::Buffer;
use ratatui::layout::{Direction, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Widget};

pub const DEFAULT_WIDTH: u16 = 80;
const MAX_BARS: usize = 200;

/// Horizontal bar chart, one row per `(label, value)` pair, as plain text.
pub fn bar_chart(title: &str, data: &[(String, u64)], width: u16) -> String {
    if data.is_empty() {
        return format!("{title}\n(no data)\n");
    }
    let data = &data[..data.len().min(MAX_BARS)];

    let bars: Vec<Bar> = data
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .value(*value)
                .label(Line::from(label.clone()))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();
    let max = data.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);

    let chart = BarChart::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(max)
        .data(BarGroup::default().bars(&bars));

    let height = data.len() as u16 + 2;
    let area = Rect::new(0, 0, width.max(20), height);
    let mut buf = Buffer::empty(area);
    chart.render(area, &mut buf);
    flatten(&buf)
}

/// Equal-width histogram of `values` in `bins` buckets.
pub fn histogram(title: &str, values: &[f64], bins: usize, unit: &str, width: u16) -> String {
    let buckets = bucketize(values, bins);
    let data: Vec<(String, u64)> = buckets
        .iter()
        .map(|b| (format!("{:.0}-{:.0}{unit}", b.start, b.end), b.count))
        .collect();
    bar_chart(title, &data, width)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

/// Split `[min, max]` into `bins` equal buckets; the last one includes `max`.
pub fn bucketize(values: &[f64], bins: usize) -> Vec<Bucket> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let step = span / bins as f64;

    let mut buckets: Vec<Bucket> = (0..bins)
        .map(|i| Bucket {
            start: min + step * i as f64,
            end: min + step * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / step) as usize).min(bins - 1);
        buckets[idx].count += 1;
    }
    buckets
}

fn flatten(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            line.push_str(buf.get(x, y).symbol());
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_title_labels_and_frame() {
        let data = vec![("2022".to_string(), 3), ("2023".to_string(), 12), ("2024".to_string(), 7)];
        let text = bar_chart("Commits per year", &data, 40);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), data.len() + 2);
        assert!(lines[0].contains("Commits per year"));
        assert!(text.contains("2022"));
        assert!(text.contains("2024"));
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }

    #[test]
    fn empty_series_renders_placeholder() {
        assert_eq!(bar_chart("Nothing", &[], 40), "Nothing\n(no data)\n");
    }

    #[test]
    fn buckets_cover_every_value() {
        let values = [0.0, 1.0, 2.5, 5.0, 10.0];
        let buckets = bucketize(&values, 4);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 5);
        assert_eq!(buckets[3].count, 1);
        assert_eq!(buckets[0].start, 0.0);
        assert_eq!(buckets[3].end, 10.0);
    }

    #[test]
    fn identical_values_fall_in_first_bucket() {
        let buckets = bucketize(&[4.0, 4.0], 20);
        assert_eq!(buckets[0].count, 2);
        assert!(bucketize(&[], 20).is_empty());
    }
}
