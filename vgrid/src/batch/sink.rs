//! Feature sinks for the batch generator.
//!
//! A sink receives features one at a time in enumeration order.
//! [`GeoJsonSink`] streams a GeoJSON `FeatureCollection` without holding
//! the collection in memory; [`MemorySink`] keeps everything for tests and
//! embedding hosts.

use std::io::Write;

use geo::Polygon;
use serde::Serialize;
use serde_json::{json, Value};

use super::metrics::CellMetrics;
use crate::dggs::CellId;
use crate::error::VgridError;
use crate::family::DggsFamily;

/// One generated cell with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: CellId,
    pub family: DggsFamily,
    pub resolution: u8,
    /// One part, or several after an antimeridian split.
    pub geometry: Vec<Polygon<f64>>,
    pub metrics: Option<CellMetrics>,
}

#[derive(Serialize)]
struct Properties<'a> {
    id: &'a str,
    family: &'static str,
    resolution: u8,
    #[serde(flatten)]
    metrics: Option<&'a CellMetrics>,
}

impl Feature {
    /// GeoJSON `Feature` object.
    pub fn to_geojson(&self) -> Result<Value, VgridError> {
        let properties = serde_json::to_value(Properties {
            id: self.id.as_str(),
            family: self.family.key(),
            resolution: self.resolution,
            metrics: self.metrics.as_ref(),
        })?;
        Ok(json!({
            "type": "Feature",
            "id": self.id.as_str(),
            "geometry": polygons_to_geojson(&self.geometry),
            "properties": properties,
        }))
    }
}

/// Destination of generated features.
pub trait FeatureSink {
    /// Accept one feature.
    fn add(&mut self, feature: &Feature) -> Result<(), VgridError>;

    /// Flush and close; called once after the last feature.
    fn finish(&mut self) -> Result<(), VgridError> {
        Ok(())
    }
}

impl<S: FeatureSink + ?Sized> FeatureSink for &mut S {
    fn add(&mut self, feature: &Feature) -> Result<(), VgridError> {
        (**self).add(feature)
    }

    fn finish(&mut self) -> Result<(), VgridError> {
        (**self).finish()
    }
}

/// Keeps every feature in a `Vec`.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub features: Vec<Feature>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids in arrival order.
    pub fn ids(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.id.as_str()).collect()
    }
}

impl FeatureSink for MemorySink {
    fn add(&mut self, feature: &Feature) -> Result<(), VgridError> {
        self.features.push(feature.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VgridError> {
        self.finished = true;
        Ok(())
    }
}

/// Streams a GeoJSON `FeatureCollection` to a writer.
///
/// The collection header is written with the first feature; `finish`
/// closes it (and writes an empty collection when nothing was added).
#[derive(Debug)]
pub struct GeoJsonSink<W: Write> {
    writer: W,
    written: usize,
    finished: bool,
}

impl<W: Write> GeoJsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            finished: false,
        }
    }

    /// Features written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), VgridError> {
        self.writer.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[\n")?;
        Ok(())
    }
}

impl<W: Write> FeatureSink for GeoJsonSink<W> {
    fn add(&mut self, feature: &Feature) -> Result<(), VgridError> {
        if self.finished {
            return Err(VgridError::Io(std::io::Error::other("GeoJSON sink already finished")));
        }
        if self.written == 0 {
            self.write_header()?;
        } else {
            self.writer.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut self.writer, &feature.to_geojson()?)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VgridError> {
        if self.finished {
            return Ok(());
        }
        if self.written == 0 {
            self.write_header()?;
        }
        self.writer.write_all(b"\n]}\n")?;
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }
}

fn ring_coords(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

/// GeoJSON geometry for one or more polygons.
///
/// A single part is a `Polygon`; several parts form a `MultiPolygon`.
pub fn polygons_to_geojson(parts: &[Polygon<f64>]) -> Value {
    match parts {
        [single] => json!({
            "type": "Polygon",
            "coordinates": ring_coords(single),
        }),
        _ => json!({
            "type": "MultiPolygon",
            "coordinates": parts.iter().map(ring_coords).collect::<Vec<_>>(),
        }),
    }
}
