use crate::chart::{ChartLayout, ChartView};
use crate::classify::ColorScale;
use crate::config::{InputConfig, ProjectionConfig, WindowConfig};
use crate::data::{join_rows, Sources};
use crate::geometry::{resolve_municipalities, resolve_outline};
use crate::map::{MapLayout, MapView};
use crate::style::StrokeStyle;
use crate::types::{Attribute, AttributeRow, MunicipalityFeature, NationalOutline};
use anyhow::Result;
use tracing::{debug, info};

// Label offsets from the pointer, and the overflow margins that flip it.
const LABEL_OFFSET_X: f64 = 10.0;
const LABEL_OFFSET_ABOVE: f64 = 75.0;
const LABEL_OFFSET_BELOW: f64 = 25.0;
const LABEL_RIGHT_MARGIN: f64 = 20.0;

/// Pointer position in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

/// Floating label for the hovered municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoLabel {
    pub code: String,
    pub name: String,
    pub attribute: Attribute,
    /// `None` when the municipality never received attribute values.
    pub value: Option<f64>,
    pub position: Option<(f64, f64)>,
}

impl InfoLabel {
    pub fn value_text(&self) -> String {
        match self.value {
            Some(v) => format!("{}%", v),
            None => "No data".to_string(),
        }
    }
}

/// Where the label goes for a pointer, flipped so it stays inside the window.
pub fn label_position(pointer: Pointer, label_width: f64, window_width: f64) -> (f64, f64) {
    let x = if pointer.x > window_width - label_width - LABEL_RIGHT_MARGIN {
        pointer.x - label_width - LABEL_OFFSET_X
    } else {
        pointer.x + LABEL_OFFSET_X
    };
    let y = if pointer.y < LABEL_OFFSET_ABOVE {
        pointer.y + LABEL_OFFSET_BELOW
    } else {
        pointer.y - LABEL_OFFSET_ABOVE
    };
    (x, y)
}

/// One page session: the joined data, the selected attribute, and both views.
pub struct Session {
    rows: Vec<AttributeRow>,
    features: Vec<MunicipalityFeature>,
    outline: NationalOutline,
    projection: ProjectionConfig,
    window: WindowConfig,
    selected: Attribute,
    scale: ColorScale,
    map: MapView,
    chart: ChartView,
    label: Option<InfoLabel>,
}

impl Session {
    /// Resolves boundaries, joins rows onto municipalities and draws both views.
    pub fn from_sources(
        sources: Sources,
        input: &InputConfig,
        projection: &ProjectionConfig,
        window: WindowConfig,
    ) -> Result<Self> {
        let outline = resolve_outline(&sources.national, &input.national_object)?;
        let mut features = resolve_municipalities(&sources.municipalities, &input.municipality_object)?;
        info!("Resolved {} municipality features", features.len());

        join_rows(&mut features, &sources.rows);
        Ok(Self::new(sources.rows, outline, features, projection.clone(), window))
    }

    /// `features` are expected to be joined already.
    pub fn new(
        rows: Vec<AttributeRow>,
        outline: NationalOutline,
        features: Vec<MunicipalityFeature>,
        projection: ProjectionConfig,
        window: WindowConfig,
    ) -> Self {
        let selected = Attribute::default();
        let scale = ColorScale::from_rows(&rows, selected);
        let map = MapView::new(&outline, &features, &scale, selected, MapLayout::for_window(window), &projection);
        let chart = ChartView::new(&rows, &scale, selected, ChartLayout::for_window(window));

        Self {
            rows,
            features,
            outline,
            projection,
            window,
            selected,
            scale,
            map,
            chart,
            label: None,
        }
    }

    pub fn selected(&self) -> Attribute {
        self.selected
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn chart(&self) -> &ChartView {
        &self.chart
    }

    pub fn label(&self) -> Option<&InfoLabel> {
        self.label.as_ref()
    }

    pub fn window(&self) -> WindowConfig {
        self.window
    }

    pub fn features(&self) -> &[MunicipalityFeature] {
        &self.features
    }

    /// Dropdown change: reclassify, recolor both views, resort the bars.
    pub fn select_attribute(&mut self, attr: Attribute) {
        info!("Expressing {}", attr);
        self.selected = attr;
        self.scale = ColorScale::from_rows(&self.rows, attr);
        self.map.recolor(&self.features, &self.scale, attr);
        self.chart.update(&self.rows, &self.scale, attr);

        if let Some(code) = self.label.as_ref().map(|l| l.code.clone()) {
            let position = self.label.as_ref().and_then(|l| l.position);
            self.label = self.make_label(&code);
            if let Some(label) = self.label.as_mut() {
                label.position = position;
            }
        }
    }

    /// Highlights the polygon and bar for `code` and opens its label.
    /// Any other municipality still highlighted gets its natural stroke back.
    /// Returns false when no element has that code.
    pub fn hover_enter(&mut self, code: &str) -> bool {
        if self.map.path(code).is_none() && self.chart.bar(code).is_none() {
            debug!("Hover over unknown municipality {}", code);
            return false;
        }

        let previous = self.label.as_ref().map(|l| l.code.clone()).filter(|c| c != code);
        if let Some(previous) = previous {
            debug!("Entering {} while {} is still highlighted", code, previous);
            self.map.restore_stroke(&previous);
            self.chart.restore_stroke(&previous);
        }

        let highlight = StrokeStyle::highlight();
        self.map.apply_stroke(code, &highlight);
        self.chart.apply_stroke(code, &highlight);
        self.label = self.make_label(code);
        true
    }

    /// Moves the open label with the pointer.
    pub fn hover_move(&mut self, pointer: Pointer, label_width: f64) -> Option<(f64, f64)> {
        let window_width = self.window.width;
        let label = self.label.as_mut()?;
        let position = label_position(pointer, label_width, window_width);
        label.position = Some(position);
        Some(position)
    }

    /// Closes the label and restores the natural stroke of everything sharing `code`.
    pub fn hover_leave(&mut self, code: &str) {
        self.map.restore_stroke(code);
        self.chart.restore_stroke(code);
        self.label = None;
    }

    pub fn zoom(&mut self, delta_y: f64, pointer: Pointer) {
        self.map.transform.zoom_at(delta_y, pointer.x, pointer.y);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.map.transform.pan(dx, dy);
    }

    /// Lays both views out again for a new window size, keeping zoom and hover.
    pub fn resize(&mut self, window: WindowConfig) {
        if window == self.window {
            return;
        }
        debug!("Resizing to {}x{}", window.width, window.height);
        self.window = window;

        let transform = self.map.transform;
        self.map = MapView::new(
            &self.outline,
            &self.features,
            &self.scale,
            self.selected,
            MapLayout::for_window(window),
            &self.projection,
        );
        self.map.transform = transform;
        self.chart = ChartView::new(&self.rows, &self.scale, self.selected, ChartLayout::for_window(window));

        if let Some(code) = self.label.as_ref().map(|l| l.code.clone()) {
            let highlight = StrokeStyle::highlight();
            self.map.apply_stroke(&code, &highlight);
            self.chart.apply_stroke(&code, &highlight);
        }
    }

    fn make_label(&self, code: &str) -> Option<InfoLabel> {
        let feature = self.features.iter().find(|f| f.properties.code == code);
        let row = self.rows.iter().find(|r| r.code == code);

        let (name, value) = match (feature, row) {
            (Some(f), _) if !f.properties.values.is_empty() => {
                (f.properties.name.clone(), f.properties.values.get(self.selected))
            }
            (_, Some(r)) => (r.name.clone(), Some(r.value(self.selected))),
            (Some(f), None) => (f.properties.name.clone(), None),
            (None, None) => return None,
        };

        Some(InfoLabel {
            code: code.to_string(),
            name,
            attribute: self.selected,
            value,
            position: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classify::{COLOR_CLASSES, NEUTRAL_COLOR};
    use crate::types::FeatureProperties;
    use geo::{polygon, MultiPolygon};

    fn square(lon: f64, lat: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: lon, y: lat),
            (x: lon + 0.3, y: lat),
            (x: lon + 0.3, y: lat + 0.3),
            (x: lon, y: lat + 0.3),
        ]])
    }

    fn row(code: &str, name: &str, v2020: &str, v2016: &str) -> AttributeRow {
        AttributeRow {
            code: code.to_string(),
            name: name.to_string(),
            participation_2020: v2020.to_string(),
            participation_2016: v2016.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn session_with(rows: Vec<AttributeRow>, feature_codes: &[&str]) -> Session {
        let mut features: Vec<MunicipalityFeature> = feature_codes
            .iter()
            .enumerate()
            .map(|(i, code)| MunicipalityFeature {
                geometry: square(-80.0 + i as f64 * 0.4, 37.0),
                properties: FeatureProperties {
                    code: code.to_string(),
                    name: format!("Feature {}", code),
                    ..Default::default()
                },
            })
            .collect();
        join_rows(&mut features, &rows);

        Session::new(
            rows,
            NationalOutline { geometry: square(-81.0, 36.0) },
            features,
            ProjectionConfig::default(),
            WindowConfig { width: 1200.0, height: 800.0 },
        )
    }

    pub(crate) fn sample_session() -> Session {
        session_with(
            vec![
                row("051", "Dickenson", "72.3", "50.0"),
                row("059", "Fairfax", "68.1", "71.0"),
                row("003", "Albemarle", "55.0", "64.2"),
                row("007", "Amelia", "", "58.8"),
                row("009", "Amherst", "61.4", "49.9"),
                row("011", "Appomattox", "80.2", "66.6"),
            ],
            &["051", "059", "003", "007", "009", "011", "999"],
        )
    }

    fn fill(session: &Session, code: &str) -> &'static str {
        session.map().path(code).unwrap().fill
    }

    fn bar_codes(session: &Session) -> Vec<String> {
        session.chart().bars.iter().map(|b| b.code.clone()).collect()
    }

    fn class_of(color: &str) -> usize {
        COLOR_CLASSES.iter().position(|c| *c == color).unwrap()
    }

    #[test]
    fn higher_value_is_darker_and_further_left() {
        let session = session_with(
            vec![row("051", "Dickenson", "72.3", ""), row("059", "Fairfax", "68.1", "")],
            &["051", "059"],
        );
        assert!(class_of(fill(&session, "051")) >= class_of(fill(&session, "059")));

        let chart = session.chart();
        assert!(chart.bar("051").unwrap().x < chart.bar("059").unwrap().x);
    }

    #[test]
    fn empty_value_is_neutral_and_sorted_last() {
        let session = sample_session();
        assert_eq!(fill(&session, "007"), NEUTRAL_COLOR);
        assert_eq!(session.chart().bar("007").unwrap().fill, NEUTRAL_COLOR);
        assert_eq!(bar_codes(&session).last().unwrap(), "007");
    }

    #[test]
    fn unjoined_feature_renders_neutral() {
        let session = sample_session();
        assert_eq!(fill(&session, "999"), NEUTRAL_COLOR);
        assert!(session.chart().bar("999").is_none());
    }

    #[test]
    fn attribute_round_trip_restores_colors_and_order() {
        let mut session = sample_session();
        let fills: Vec<&str> = session.map().municipalities.iter().map(|p| p.fill).collect();
        let order = bar_codes(&session);
        let scale = session.scale().clone();

        session.select_attribute(Attribute::Participation2016);
        assert_eq!(session.selected(), Attribute::Participation2016);
        assert_ne!(bar_codes(&session), order);
        assert!(session.chart().title.contains("participation_2016"));

        session.select_attribute(Attribute::Participation2020);
        let round_trip: Vec<&str> = session.map().municipalities.iter().map(|p| p.fill).collect();
        assert_eq!(round_trip, fills);
        assert_eq!(bar_codes(&session), order);
        assert_eq!(session.scale(), &scale);
    }

    #[test]
    fn hover_cycle_restores_strokes_exactly() {
        let mut session = sample_session();
        let map_before = session.map().path("059").unwrap().stroke.clone();
        let bar_before = session.chart().bar("059").unwrap().stroke.clone();

        assert!(session.hover_enter("059"));
        assert_eq!(session.map().path("059").unwrap().stroke, StrokeStyle::highlight());
        assert_eq!(session.chart().bar("059").unwrap().stroke, StrokeStyle::highlight());
        let label = session.label().unwrap();
        assert_eq!(label.name, "Feature 059");
        assert_eq!(label.value, Some(68.1));

        session.hover_leave("059");
        assert_eq!(session.map().path("059").unwrap().stroke, map_before);
        assert_eq!(session.chart().bar("059").unwrap().stroke, bar_before);
        assert!(session.label().is_none());
    }

    #[test]
    fn entering_another_code_releases_the_previous_highlight() {
        let mut session = sample_session();
        let natural_map = session.map().path("051").unwrap().stroke.clone();
        let natural_bar = session.chart().bar("051").unwrap().stroke.clone();

        session.hover_enter("051");
        session.hover_enter("059");
        session.hover_leave("059");

        assert_eq!(session.map().path("051").unwrap().stroke, natural_map);
        assert_eq!(session.chart().bar("051").unwrap().stroke, natural_bar);
        assert_eq!(session.map().path("059").unwrap().stroke, natural_map);
        assert!(session.label().is_none());
    }

    #[test]
    fn out_of_order_leave_does_not_strand_a_highlight() {
        let mut session = sample_session();
        let natural = session.map().path("059").unwrap().stroke.clone();
        let natural_bar = session.chart().bar("059").unwrap().stroke.clone();

        session.hover_enter("051");
        session.hover_leave("051");
        session.hover_leave("059");
        session.hover_enter("059");
        session.hover_enter("003");

        assert_eq!(session.map().path("059").unwrap().stroke, natural);
        assert_eq!(session.chart().bar("059").unwrap().stroke, natural_bar);
        assert_eq!(session.map().path("003").unwrap().stroke, StrokeStyle::highlight());
        assert_eq!(session.label().unwrap().code, "003");

        session.hover_leave("003");
        let highlighted = session
            .map()
            .municipalities
            .iter()
            .filter(|p| p.stroke == StrokeStyle::highlight())
            .count();
        assert_eq!(highlighted, 0);
    }

    #[test]
    fn unknown_code_keeps_the_current_highlight() {
        let mut session = sample_session();
        session.hover_enter("051");
        assert!(!session.hover_enter("nope"));
        assert_eq!(session.map().path("051").unwrap().stroke, StrokeStyle::highlight());
        assert_eq!(session.label().unwrap().code, "051");
    }

    #[tokio::test]
    async fn loaded_sources_resolve_join_and_color() {
        use crate::data::load_sources;
        use crate::data::tests::PARTICIPATION_CSV;
        use crate::geometry::tests::{MUNICIPALITY_TOPOLOGY, NATIONAL_GEOJSON};
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let input = InputConfig {
            attributes_csv: dir.path().join("participation.csv"),
            national: dir.path().join("us.geojson"),
            municipalities: dir.path().join("va.topojson"),
            national_object: "UnitedStates".into(),
            municipality_object: "VirginiaMunicipalities".into(),
        };
        fs::write(&input.attributes_csv, PARTICIPATION_CSV).unwrap();
        fs::write(&input.national, NATIONAL_GEOJSON).unwrap();
        fs::write(&input.municipalities, MUNICIPALITY_TOPOLOGY).unwrap();

        let sources = load_sources(&input).await.unwrap();
        let session = Session::from_sources(
            sources,
            &input,
            &ProjectionConfig::default(),
            WindowConfig { width: 1200.0, height: 800.0 },
        )
        .unwrap();

        let codes: Vec<&str> = session.features().iter().map(|f| f.properties.code.as_str()).collect();
        assert_eq!(codes, vec!["051", "59"]);
        assert!(COLOR_CLASSES.contains(&fill(&session, "051")));
        assert_eq!(fill(&session, "59"), NEUTRAL_COLOR);
        assert!(session.features()[1].properties.values.is_empty());

        // The chart is driven by the table, so "059" still gets a bar.
        assert_eq!(bar_codes(&session), vec!["051", "059"]);
        assert!(!session.map().outline_d.is_empty());
    }

    #[test]
    fn hover_over_unknown_code_does_nothing() {
        let mut session = sample_session();
        assert!(!session.hover_enter("nope"));
        assert!(session.label().is_none());
    }

    #[test]
    fn unjoined_feature_label_says_no_data() {
        let mut session = sample_session();
        assert!(session.hover_enter("999"));
        assert_eq!(session.label().unwrap().value_text(), "No data");
    }

    #[test]
    fn label_flips_near_right_and_top_edges() {
        assert_eq!(label_position(Pointer { x: 1195.0, y: 50.0 }, 120.0, 1200.0), (1065.0, 75.0));
        assert_eq!(label_position(Pointer { x: 300.0, y: 400.0 }, 120.0, 1200.0), (310.0, 325.0));
    }

    #[test]
    fn hover_move_positions_only_an_open_label() {
        let mut session = sample_session();
        assert_eq!(session.hover_move(Pointer { x: 1195.0, y: 50.0 }, 120.0), None);

        session.hover_enter("051");
        assert_eq!(session.hover_move(Pointer { x: 1195.0, y: 50.0 }, 120.0), Some((1065.0, 75.0)));
        assert_eq!(session.label().unwrap().position, Some((1065.0, 75.0)));
    }

    #[test]
    fn attribute_change_refreshes_open_label() {
        let mut session = sample_session();
        session.hover_enter("051");
        session.select_attribute(Attribute::Participation2016);
        let label = session.label().unwrap();
        assert_eq!(label.attribute, Attribute::Participation2016);
        assert_eq!(label.value, Some(50.0));
    }

    #[test]
    fn zoom_does_not_reclassify() {
        let mut session = sample_session();
        let scale = session.scale().clone();
        session.zoom(-300.0, Pointer { x: 100.0, y: 100.0 });
        session.pan(15.0, -5.0);
        assert!(session.map().transform.k > 1.0);
        assert_eq!(session.scale(), &scale);
    }

    #[test]
    fn resize_keeps_highlight_and_zoom() {
        let mut session = sample_session();
        session.zoom(-300.0, Pointer { x: 100.0, y: 100.0 });
        let transform = session.map().transform;
        session.hover_enter("003");

        session.resize(WindowConfig { width: 900.0, height: 700.0 });
        assert_eq!(session.map().transform, transform);
        assert_eq!(session.map().path("003").unwrap().stroke, StrokeStyle::highlight());
        assert_eq!(session.chart().layout.top, 700.0 - 150.0 - 39.0);
    }
}
