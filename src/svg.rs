//! Serializes the map, chart and hover label to SVG / HTML text.
//!
//! Pure functions over the views; no I/O.

use crate::chart::ChartView;
use crate::controller::{InfoLabel, Session};
use crate::map::{MapView, MAP_TITLE};
use crate::style::StrokeStyle;
use std::fmt::Write;

/// Escape the five XML special characters for text content and attribute values.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn style_attr(fill: &str, stroke: &StrokeStyle) -> String {
    format!(
        "fill: {}; stroke: {}; stroke-width: {}",
        fill,
        xml_escape(&stroke.stroke),
        xml_escape(&stroke.stroke_width)
    )
}

fn write_map_body(out: &mut String, map: &MapView) {
    let _ = writeln!(out, r#"  <g transform="{}">"#, map.transform.to_attr());
    let _ = writeln!(out, r#"    <path class="states" d="{}"/>"#, map.outline_d);
    for path in &map.municipalities {
        let _ = writeln!(
            out,
            r#"    <path class="municipalities {}" data-code="{}" d="{}" style="{}"><title>{}</title></path>"#,
            xml_escape(&path.code),
            xml_escape(&path.code),
            path.d,
            style_attr(path.fill, &path.stroke),
            xml_escape(&path.name),
        );
    }
    let _ = writeln!(out, "  </g>");

    let title_box = map.layout.title_box;
    let _ = writeln!(
        out,
        r#"  <rect class="titleBox" x="{}" y="{}" rx="5" width="{}" height="{}"/>"#,
        title_box.x, title_box.y, title_box.width, title_box.height
    );
    let _ = writeln!(
        out,
        r#"  <text class="mapTitle" x="{}" y="{}">{}</text>"#,
        map.layout.title_x,
        map.layout.title_y,
        xml_escape(MAP_TITLE)
    );
}

fn write_chart_body(out: &mut String, chart: &ChartView) {
    let layout = chart.layout;
    let translate = format!(
        "translate({},{})",
        crate::chart::LEFT_PADDING,
        crate::chart::TOP_BOTTOM_PADDING
    );

    let _ = writeln!(
        out,
        r#"  <rect class="chartBackground" width="{}" height="{}" transform="{}"/>"#,
        layout.inner_width, layout.inner_height, translate
    );
    for bar in &chart.bars {
        let _ = writeln!(
            out,
            r#"  <rect class="bar {}" data-code="{}" x="{}" y="{}" width="{}" height="{}" style="{}"/>"#,
            xml_escape(&bar.code),
            xml_escape(&bar.code),
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            style_attr(bar.fill, &bar.stroke),
        );
    }
    let _ = writeln!(
        out,
        r#"  <text class="chartTitle" x="{}" y="{}">{}</text>"#,
        layout.title_x,
        layout.title_y,
        xml_escape(&chart.title)
    );

    let _ = writeln!(out, r#"  <g class="axis" transform="{}">"#, translate);
    let _ = writeln!(out, r#"    <path class="domain" d="M-6,{}H0V0H-6"/>"#, layout.inner_height);
    for tick in &chart.ticks {
        let _ = writeln!(
            out,
            r#"    <g class="tick" transform="translate(0,{})"><line x2="-6"/><text x="-9" dy="0.32em">{}</text></g>"#,
            tick.y, tick.value
        );
    }
    let _ = writeln!(out, "  </g>");

    let _ = writeln!(
        out,
        r#"  <rect class="chartFrame" width="{}" height="{}" transform="{}"/>"#,
        layout.inner_width, layout.inner_height, translate
    );
}

/// The map as the page's `svg.map` element.
pub fn map_svg(map: &MapView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg class="map" xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
        map.layout.width, map.layout.height
    );
    write_map_body(&mut out, map);
    out.push_str("</svg>\n");
    out
}

/// The chart as the page's absolutely positioned `svg.chart` element.
pub fn chart_svg(chart: &ChartView) -> String {
    let layout = chart.layout;
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg class="chart" xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" style="position: absolute; left: {}px; top: {}px">"#,
        layout.width, layout.height, layout.left, layout.top
    );
    write_chart_body(&mut out, chart);
    out.push_str("</svg>\n");
    out
}

/// The floating label, positioned only once the pointer has moved.
pub fn label_html(label: &InfoLabel) -> String {
    let style = match label.position {
        Some((x, y)) => format!(r#" style="left: {}px; top: {}px""#, x, y),
        None => String::new(),
    };
    format!(
        r#"<div class="infolabel" id="{}_label"{}><h1>{}</h1><b>{}</b><div class="labelname">{}</div></div>"#,
        xml_escape(&label.code),
        style,
        xml_escape(&label.value_text()),
        label.attribute,
        xml_escape(&label.name),
    )
}

/// A standalone SVG document with the map and the chart below it, for `render`.
pub fn document_svg(session: &Session) -> String {
    let window = session.window();
    let chart = session.chart();
    let mut out = String::new();

    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        window.width, window.height, window.width, window.height
    );
    let _ = writeln!(out, "  <title>{}</title>", xml_escape(MAP_TITLE));
    let _ = writeln!(
        out,
        "  <style>.states{{fill:#eee;stroke:#999;stroke-width:0.5px}}.titleBox{{fill:#fff;stroke:#444}}.mapTitle{{font:24px sans-serif}}.chartBackground{{fill:#f5f5f5}}.chartFrame{{fill:none;stroke:#444}}.chartTitle{{font:14px sans-serif}}.axis text{{font:10px sans-serif}}.axis path,.axis line{{fill:none;stroke:#444}}</style>"
    );

    write_map_body(&mut out, session.map());
    let _ = writeln!(
        out,
        r#"<g class="chart" transform="translate({},{})">"#,
        chart.layout.left, chart.layout.top
    );
    write_chart_body(&mut out, chart);
    let _ = writeln!(out, "</g>");
    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::sample_session;
    use crate::controller::Pointer;
    use crate::types::Attribute;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(xml_escape(r#"<a & 'b'>"#), "&lt;a &amp; &apos;b&apos;&gt;");
    }

    #[test]
    fn map_svg_carries_classes_fills_and_transform() {
        let session = sample_session();
        let svg = map_svg(session.map());

        assert!(svg.starts_with(r#"<svg class="map""#));
        assert!(svg.contains(r#"class="municipalities 051""#));
        assert!(svg.contains(r#"class="states""#));
        assert!(svg.contains("translate(0,0) scale(1)"));
        assert!(svg.contains("stroke: #000; stroke-width: 0.5px"));
        assert!(svg.contains(MAP_TITLE));
    }

    #[test]
    fn chart_svg_has_one_bar_per_row_and_title() {
        let session = sample_session();
        let svg = chart_svg(session.chart());

        assert_eq!(svg.matches(r#"class="bar "#).count(), 6);
        assert_eq!(svg.matches(r#"class="tick""#).count(), 6);
        assert!(svg.contains("Percentage of voter participation_2020 in each municipality"));
        assert!(svg.contains(r#"height="NaN""#));
        assert!(svg.contains("position: absolute; left: 30px"));
    }

    #[test]
    fn highlight_shows_in_both_views() {
        let mut session = sample_session();
        session.hover_enter("051");
        let highlighted = "stroke: white; stroke-width: 2";
        assert_eq!(map_svg(session.map()).matches(highlighted).count(), 1);
        assert_eq!(chart_svg(session.chart()).matches(highlighted).count(), 1);
    }

    #[test]
    fn label_html_shows_value_attribute_and_name() {
        let mut session = sample_session();
        session.select_attribute(Attribute::Participation2016);
        session.hover_enter("059");
        session.hover_move(Pointer { x: 100.0, y: 300.0 }, 120.0);

        let html = label_html(session.label().unwrap());
        assert_eq!(
            html,
            r#"<div class="infolabel" id="059_label" style="left: 110px; top: 225px"><h1>71%</h1><b>participation_2016</b><div class="labelname">Feature 059</div></div>"#
        );
    }

    #[test]
    fn document_contains_both_views() {
        let session = sample_session();
        let doc = document_svg(&session);
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains(r#"<g class="chart" transform="translate(30,611)">"#));
        assert!(doc.contains(r#"class="municipalities 999""#));
        assert!(doc.trim_end().ends_with("</svg>"));
    }
}
