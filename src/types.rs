use anyhow::{anyhow, Error};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five participation years the map can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Attribute {
    #[default]
    #[serde(rename = "participation_2020")]
    Participation2020,
    #[serde(rename = "participation_2016")]
    Participation2016,
    #[serde(rename = "participation_2012")]
    Participation2012,
    #[serde(rename = "participation_2008")]
    Participation2008,
    #[serde(rename = "participation_2004")]
    Participation2004,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Participation2020,
        Attribute::Participation2016,
        Attribute::Participation2012,
        Attribute::Participation2008,
        Attribute::Participation2004,
    ];

    /// Column name in the attribute table, also the dropdown label.
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Participation2020 => "participation_2020",
            Attribute::Participation2016 => "participation_2016",
            Attribute::Participation2012 => "participation_2012",
            Attribute::Participation2008 => "participation_2008",
            Attribute::Participation2004 => "participation_2004",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown attribute: {}", s))
    }
}

/// Parses attribute text the lenient way: anything unparsable is NaN.
pub fn parse_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// One municipality row of the attribute table. Values stay as text until read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeRow {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub participation_2020: String,
    #[serde(default)]
    pub participation_2016: String,
    #[serde(default)]
    pub participation_2012: String,
    #[serde(default)]
    pub participation_2008: String,
    #[serde(default)]
    pub participation_2004: String,
}

impl AttributeRow {
    pub fn raw(&self, attr: Attribute) -> &str {
        match attr {
            Attribute::Participation2020 => &self.participation_2020,
            Attribute::Participation2016 => &self.participation_2016,
            Attribute::Participation2012 => &self.participation_2012,
            Attribute::Participation2008 => &self.participation_2008,
            Attribute::Participation2004 => &self.participation_2004,
        }
    }

    pub fn value(&self, attr: Attribute) -> f64 {
        parse_number(self.raw(attr))
    }
}

/// Joined numeric values of a feature, one slot per attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttributeValues([Option<f64>; 5]);

impl AttributeValues {
    pub fn get(&self, attr: Attribute) -> Option<f64> {
        self.0[attr.slot()]
    }

    pub fn set(&mut self, attr: Attribute, value: f64) {
        self.0[attr.slot()] = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureProperties {
    pub code: String,
    pub name: String,
    pub values: AttributeValues,
}

#[derive(Debug, Clone)]
pub struct MunicipalityFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone)]
pub struct NationalOutline {
    pub geometry: MultiPolygon<f64>,
}
