use crate::config::InputConfig;
use crate::geometry::GeometrySource;
use crate::types::{Attribute, AttributeRow, MunicipalityFeature};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::info;

/// Everything the page needs, in load order: rows, national layer, municipality layer.
pub struct Sources {
    pub rows: Vec<AttributeRow>,
    pub national: GeometrySource,
    pub municipalities: GeometrySource,
}

/// Reads the three input files concurrently. Any failure aborts the whole load.
pub async fn load_sources(input: &InputConfig) -> Result<Sources> {
    info!("Loading attribute table and boundary files");

    let (csv_text, national_text, municipality_text) = tokio::try_join!(
        read_source(&input.attributes_csv),
        read_source(&input.national),
        read_source(&input.municipalities),
    )?;

    let rows = parse_rows(&csv_text)
        .with_context(|| format!("Failed to parse CSV file: {:?}", input.attributes_csv))?;
    info!("Loaded attribute data for {} municipalities", rows.len());

    let national = GeometrySource::parse(&input.national, &national_text)?;
    let municipalities = GeometrySource::parse(&input.municipalities, &municipality_text)?;

    Ok(Sources {
        rows,
        national,
        municipalities,
    })
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file: {:?}", path))
}

pub fn parse_rows(text: &str) -> Result<Vec<AttributeRow>> {
    let mut rdr = ReaderBuilder::new().from_reader(text.as_bytes());
    let mut rows = Vec::new();

    for result in rdr.deserialize::<AttributeRow>() {
        let row = result?;
        if row.code.is_empty() {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Copies every row's parsed values onto the feature with the same code.
///
/// Features keep their order; unmatched features and rows are left alone.
/// Returns the number of rows that found a feature.
pub fn join_rows(features: &mut [MunicipalityFeature], rows: &[AttributeRow]) -> usize {
    let mut matched = 0;

    for row in rows {
        let mut found = false;
        for feature in features.iter_mut() {
            if feature.properties.code == row.code {
                for attr in Attribute::ALL {
                    feature.properties.values.set(attr, row.value(attr));
                }
                found = true;
            }
        }
        if found {
            matched += 1;
        }
    }

    info!("Joined {} of {} attribute rows onto {} features", matched, rows.len(), features.len());
    matched
}
