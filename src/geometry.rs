use crate::types::{FeatureProperties, MunicipalityFeature, NationalOutline};
use anyhow::{anyhow, Context, Result};
use geo::{Geometry, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::convert::TryInto;
use std::path::Path;
use topojson::TopoJson;
use tracing::{debug, warn};

/// A decoded boundary file, before its polygons are expanded.
pub enum GeometrySource {
    Topology(topojson::Topology),
    Features(FeatureCollection),
}

impl GeometrySource {
    /// Decodes boundary text, choosing the format from the file extension.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s: &str| s.to_lowercase())
            .ok_or_else(|| anyhow!("Boundary file has no extension: {:?}", path))?;

        match extension.as_str() {
            "topojson" | "json" => match text.parse::<TopoJson>() {
                Ok(TopoJson::Topology(topology)) => Ok(GeometrySource::Topology(topology)),
                Ok(_) => Err(anyhow!("{:?} is not a TopoJSON Topology", path)),
                Err(e) => Err(anyhow!("Failed to parse TopoJSON {:?}: {:?}", path, e)),
            },
            "geojson" => {
                let geojson = text
                    .parse::<GeoJson>()
                    .with_context(|| format!("Failed to parse GeoJSON {:?}", path))?;
                match geojson {
                    GeoJson::FeatureCollection(fc) => Ok(GeometrySource::Features(fc)),
                    _ => Err(anyhow!("GeoJSON {:?} must be a FeatureCollection", path)),
                }
            }
            _ => Err(anyhow!("Unsupported boundary format: {}", extension)),
        }
    }

    /// Expands the named object into GeoJSON features.
    ///
    /// A FeatureCollection holds a single layer, so `object` only matters for topologies.
    fn features(&self, object: &str) -> Result<Vec<Feature>> {
        let collection = match self {
            GeometrySource::Topology(topology) => {
                let decoded = topojson::to_geojson(topology, &object.to_string())
                    .map_err(|e| anyhow!("Failed to decode topology object '{}': {:?}", object, e))?;
                let value = serde_json::to_value(&decoded)
                    .with_context(|| format!("Failed to re-encode topology object '{}'", object))?;
                serde_json::from_value::<FeatureCollection>(value)
                    .with_context(|| format!("Topology object '{}' is not a feature collection", object))?
            }
            GeometrySource::Features(fc) => {
                debug!("GeoJSON source, ignoring object key '{}'", object);
                fc.clone()
            }
        };

        if collection.features.is_empty() {
            return Err(anyhow!("Boundary object '{}' contains no features", object));
        }
        Ok(collection.features)
    }
}

/// Merges every polygon of the national object into one backdrop geometry.
pub fn resolve_outline(source: &GeometrySource, object: &str) -> Result<NationalOutline> {
    let mut polygons = Vec::new();
    for feature in source.features(object)? {
        if let Some(mp) = feature_polygons(&feature)? {
            polygons.extend(mp);
        }
    }
    Ok(NationalOutline {
        geometry: MultiPolygon::new(polygons),
    })
}

/// Expands the municipality object into features, keeping source order.
pub fn resolve_municipalities(source: &GeometrySource, object: &str) -> Result<Vec<MunicipalityFeature>> {
    let mut municipalities = Vec::new();

    for feature in source.features(object)? {
        let props = feature.properties.as_ref();
        let code = match props.and_then(|p| p.get("code")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                warn!("Skipping municipality feature without a code");
                continue;
            }
        };
        let name = match props.and_then(|p| p.get("name")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => String::new(),
        };

        let geometry = match feature_polygons(&feature)? {
            Some(mp) => mp,
            None => {
                warn!("Skipping municipality {} without areal geometry", code);
                continue;
            }
        };

        municipalities.push(MunicipalityFeature {
            geometry,
            properties: FeatureProperties {
                code,
                name,
                ..Default::default()
            },
        });
    }

    Ok(municipalities)
}

fn feature_polygons(feature: &Feature) -> Result<Option<MultiPolygon<f64>>> {
    let geometry = match &feature.geometry {
        Some(geometry) => geometry,
        None => return Ok(None),
    };
    let geometry: Geometry<f64> = geometry
        .value
        .clone()
        .try_into()
        .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

    let mut polygons = Vec::new();
    collect_polygons(geometry, &mut polygons);
    if polygons.is_empty() {
        Ok(None)
    } else {
        Ok(Some(MultiPolygon::new(polygons)))
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}
