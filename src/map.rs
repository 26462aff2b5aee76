use crate::classify::ColorScale;
use crate::config::{ProjectionConfig, WindowConfig};
use crate::projection::AlbersProjection;
use crate::style::{NaturalStyles, StrokeStyle};
use crate::types::{Attribute, MunicipalityFeature, NationalOutline};

pub const MAP_TITLE: &str = "Voter Participation by Municipality";

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 8.0;

// Wheel delta in pixels to log2 of the zoom factor.
const WHEEL_SENSITIVITY: f64 = 0.002;

fn natural_stroke() -> StrokeStyle {
    StrokeStyle::new("#000", "0.5px")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Map frame and title placement for a window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapLayout {
    pub width: f64,
    pub height: f64,
    pub title_box: Rect,
    pub title_x: f64,
    pub title_y: f64,
}

impl MapLayout {
    pub fn for_window(window: WindowConfig) -> Self {
        Self {
            width: window.width * 0.95,
            height: window.height * 0.95,
            title_box: Rect {
                x: window.width - 653.0,
                y: 5.0,
                width: 575.0,
                height: 50.0,
            },
            title_x: window.width - 633.0,
            title_y: 40.0,
        }
    }
}

/// Pan/zoom applied to the geometry layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self { k: 1.0, x: 0.0, y: 0.0 }
    }
}

impl ZoomTransform {
    /// Zooms toward a focus point (screen coordinates), keeping it fixed.
    pub fn zoom_at(&mut self, delta_y: f64, focus_x: f64, focus_y: f64) {
        let new_k = (self.k * (-delta_y * WHEEL_SENSITIVITY).exp2()).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = new_k / self.k;

        self.x = focus_x - (focus_x - self.x) * ratio;
        self.y = focus_y - (focus_y - self.y) * ratio;
        self.k = new_k;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn to_attr(&self) -> String {
        format!("translate({},{}) scale({})", self.x, self.y, self.k)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityPath {
    pub code: String,
    pub name: String,
    pub d: String,
    pub fill: &'static str,
    pub stroke: StrokeStyle,
}

/// The map: national backdrop plus one colored polygon per municipality.
#[derive(Debug, Clone)]
pub struct MapView {
    pub layout: MapLayout,
    pub outline_d: String,
    pub municipalities: Vec<MunicipalityPath>,
    pub transform: ZoomTransform,
    natural: NaturalStyles,
}

impl MapView {
    pub fn new(
        outline: &NationalOutline,
        features: &[MunicipalityFeature],
        scale: &ColorScale,
        attr: Attribute,
        layout: MapLayout,
        projection: &ProjectionConfig,
    ) -> Self {
        let projection = AlbersProjection::new(projection, (layout.width / 2.0, layout.height / 2.0));
        let mut natural = NaturalStyles::default();

        let municipalities = features
            .iter()
            .map(|feature| {
                let stroke = natural_stroke();
                natural.record(&feature.properties.code, &stroke);
                MunicipalityPath {
                    code: feature.properties.code.clone(),
                    name: feature.properties.name.clone(),
                    d: projection.path_data(&feature.geometry),
                    fill: scale.color(feature.properties.values.get(attr)),
                    stroke,
                }
            })
            .collect();

        Self {
            layout,
            outline_d: projection.path_data(&outline.geometry),
            municipalities,
            transform: ZoomTransform::default(),
            natural,
        }
    }

    /// Refills every polygon; `features` must be the ones the view was built from.
    pub fn recolor(&mut self, features: &[MunicipalityFeature], scale: &ColorScale, attr: Attribute) {
        for (path, feature) in self.municipalities.iter_mut().zip(features) {
            path.fill = scale.color(feature.properties.values.get(attr));
        }
    }

    pub fn path(&self, code: &str) -> Option<&MunicipalityPath> {
        self.municipalities.iter().find(|p| p.code == code)
    }

    /// Sets the stroke of every polygon with `code`; returns how many changed.
    pub fn apply_stroke(&mut self, code: &str, style: &StrokeStyle) -> usize {
        let mut count = 0;
        for path in self.municipalities.iter_mut().filter(|p| p.code == code) {
            path.stroke = style.clone();
            count += 1;
        }
        count
    }

    /// Puts back the stroke recorded when the polygons were drawn.
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
