use crate::classify::ColorScale;
use crate::config::WindowConfig;
use crate::style::{NaturalStyles, StrokeStyle};
use crate::types::{Attribute, AttributeRow};
use std::cmp::Ordering;

pub const CHART_HEIGHT: f64 = 150.0;
pub const LEFT_PADDING: f64 = 25.0;
pub const RIGHT_PADDING: f64 = 2.0;
pub const TOP_BOTTOM_PADDING: f64 = 5.0;
pub const AXIS_TICKS: usize = 5;

const BAR_GAP: f64 = 1.0;

fn natural_stroke() -> StrokeStyle {
    StrokeStyle::new("none", "0px")
}

pub fn chart_title(attr: Attribute) -> String {
    format!("Percentage of voter {} in each municipality", attr)
}

/// Linear scale from a value domain to a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    /// Percentages onto the inner chart height, zero at the bottom.
    pub fn percent() -> Self {
        Self {
            domain: (0.0, 100.0),
            range: (140.0, 0.0),
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    /// Round tick values spanning the domain, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (start, stop) = self.domain;
        if count == 0 || !(stop > start) {
            return Vec::new();
        }
        let step = tick_step(start, stop, count);
        let first = (start / step).ceil() as i64;
        let last = (stop / step).floor() as i64;
        (first..=last).map(|i| i as f64 * step).collect()
    }
}

fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start) / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let error = raw / power;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

/// Bar chart frame for a window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
    pub left: f64,
    pub top: f64,
    pub title_x: f64,
    pub title_y: f64,
}

impl ChartLayout {
    pub fn for_window(window: WindowConfig) -> Self {
        let width = window.width * 0.95 - 20.0;
        Self {
            width,
            height: CHART_HEIGHT,
            inner_width: width - LEFT_PADDING - RIGHT_PADDING,
            inner_height: CHART_HEIGHT - TOP_BOTTOM_PADDING * 2.0,
            left: 30.0,
            top: window.height - CHART_HEIGHT - 39.0,
            title_x: width - 460.0,
            title_y: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub code: String,
    pub name: String,
    /// Index of the source row in the attribute table.
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
    pub stroke: StrokeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub y: f64,
}

/// Row indices sorted descending by `attr`, starting from table order.
///
/// Equal values keep table order. NaN is never greater than a number:
/// every NaN row sorts after all numeric rows, in table order.
pub fn sort_order(rows: &[AttributeRow], attr: Attribute) -> Vec<usize> {
    let values: Vec<f64> = rows.iter().map(|row| row.value(attr)).collect();
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| descending(values[a], values[b]));
    order
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// One bar per attribute row plus the fixed axis and title.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub layout: ChartLayout,
    pub bars: Vec<Bar>,
    pub title: String,
    pub ticks: Vec<Tick>,
    y_scale: LinearScale,
    natural: NaturalStyles,
}

impl ChartView {
    pub fn new(rows: &[AttributeRow], scale: &ColorScale, attr: Attribute, layout: ChartLayout) -> Self {
        let y_scale = LinearScale::percent();
        let mut natural = NaturalStyles::default();

        let bars = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let stroke = natural_stroke();
                natural.record(&row.code, &stroke);
                Bar {
                    code: row.code.clone(),
                    name: row.name.clone(),
                    row: i,
                    x: 0.0,
                    y: 0.0,
                    width: 0.0,
                    height: 0.0,
                    fill: "",
                    stroke,
                }
            })
            .collect();

        // The axis is drawn once against the fixed percentage scale.
        let ticks = y_scale
            .ticks(AXIS_TICKS)
            .into_iter()
            .map(|value| Tick { value, y: y_scale.apply(value) })
            .collect();

        let mut chart = Self {
            layout,
            bars,
            title: String::new(),
            ticks,
            y_scale,
            natural,
        };
        chart.update(rows, scale, attr);
        chart
    }

    /// Sorts, positions, sizes and colors every bar for `attr`, and retitles the chart.
    pub fn update(&mut self, rows: &[AttributeRow], scale: &ColorScale, attr: Attribute) {
        let order = sort_order(rows, attr);
        let mut rank = vec![0; rows.len()];
        for (position, &row) in order.iter().enumerate() {
            rank[row] = position;
        }
        self.bars.sort_by_key(|bar| rank[bar.row]);

        let n = rows.len() as f64;
        let slot = self.layout.inner_width / n;
        for (i, bar) in self.bars.iter_mut().enumerate() {
            let value = rows[bar.row].value(attr);
            let y = self.y_scale.apply(value);
            bar.x = i as f64 * slot + LEFT_PADDING;
            bar.width = slot - BAR_GAP;
            bar.height = self.layout.inner_height - y;
            bar.y = y + TOP_BOTTOM_PADDING;
            bar.fill = scale.color(Some(value));
        }

        self.title = chart_title(attr);
    }

    pub fn bar(&self, code: &str) -> Option<&Bar> {
        self.bars.iter().find(|b| b.code == code)
    }

    pub fn apply_stroke(&mut self, code: &str, style: &StrokeStyle) -> usize {
        let mut count = 0;
        for bar in self.bars.iter_mut().filter(|b| b.code == code) {
            bar.stroke = style.clone();
            count += 1;
        }
        count
    }

    pub fn restore_stroke(&mut self, code: &str) -> usize {
        match self.natural.get(code) {
            Some(style) => {
                let style = style.clone();
                self.apply_stroke(code, &style)
            }
            None => 0,
        }
    }
}
