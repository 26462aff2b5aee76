use std::collections::HashMap;

/// Stroke of a highlighted polygon or bar.
pub const HIGHLIGHT_STROKE: &str = "white";
pub const HIGHLIGHT_STROKE_WIDTH: &str = "2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrokeStyle {
    pub stroke: String,
    pub stroke_width: String,
}

impl StrokeStyle {
    pub fn new(stroke: &str, stroke_width: &str) -> Self {
        Self {
            stroke: stroke.to_string(),
            stroke_width: stroke_width.to_string(),
        }
    }

    pub fn highlight() -> Self {
        Self::new(HIGHLIGHT_STROKE, HIGHLIGHT_STROKE_WIDTH)
    }
}

/// Stroke each element had before any highlight, keyed by municipality code.
#[derive(Debug, Clone, Default)]
pub struct NaturalStyles(HashMap<String, StrokeStyle>);

impl NaturalStyles {
    /// Keeps the first style seen for a code.
    pub fn record(&mut self, code: &str, style: &StrokeStyle) {
        self.0.entry(code.to_string()).or_insert_with(|| style.clone());
    }

    pub fn get(&self, code: &str) -> Option<&StrokeStyle> {
        self.0.get(code)
    }
}
