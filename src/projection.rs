//! Albers equal-area conic projection and SVG path data for projected polygons.

use crate::config::ProjectionConfig;
use geo::{LineString, MultiPolygon};
use std::f64::consts::PI;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct AlbersProjection {
    n: f64,
    c: f64,
    r0: f64,
    rotate_lambda: f64,
    scale: f64,
    translate: (f64, f64),
    center: (f64, f64),
}

impl AlbersProjection {
    /// Projection for `config`, with the configured center landing on `translate`.
    pub fn new(config: &ProjectionConfig, translate: (f64, f64)) -> Self {
        let phi0 = config.parallels[0].to_radians();
        let phi1 = config.parallels[1].to_radians();
        let sy0 = phi0.sin();
        let n = (sy0 + phi1.sin()) / 2.0;
        let c = 1.0 + sy0 * (2.0 * n - sy0);
        let r0 = c.sqrt() / n;

        let mut projection = Self {
            n,
            c,
            r0,
            rotate_lambda: config.rotate[0].to_radians(),
            scale: config.scale,
            translate,
            center: (0.0, 0.0),
        };
        projection.center = projection.raw(config.center[0].to_radians(), config.center[1].to_radians());
        projection
    }

    fn raw(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let r = (self.c - 2.0 * self.n * phi.sin()).max(0.0).sqrt() / self.n;
        let theta = lambda * self.n;
        (r * theta.sin(), self.r0 - r * theta.cos())
    }

    /// Projects a longitude/latitude pair (degrees) to screen pixels.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let mut lambda = lon.to_radians() + self.rotate_lambda;
        if lambda > PI {
            lambda -= 2.0 * PI;
        } else if lambda < -PI {
            lambda += 2.0 * PI;
        }
        let (x, y) = self.raw(lambda, lat.to_radians());
        (
            self.translate.0 + self.scale * (x - self.center.0),
            self.translate.1 - self.scale * (y - self.center.1),
        )
    }

    /// SVG `d` attribute for a multipolygon, one closed subpath per ring.
    pub fn path_data(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in geometry {
            self.write_ring(&mut d, polygon.exterior());
            for interior in polygon.interiors() {
                self.write_ring(&mut d, interior);
            }
        }
        d
    }

    fn write_ring(&self, d: &mut String, ring: &LineString<f64>) {
        if ring.0.len() < 3 {
            return;
        }
        for (i, coord) in ring.0.iter().enumerate() {
            let (x, y) = self.project(coord.x, coord.y);
            let command = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{}{:.1},{:.1}", command, x, y);
        }
        d.push('Z');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn virginia() -> AlbersProjection {
        AlbersProjection::new(&ProjectionConfig::default(), (600.0, 400.0))
    }

    #[test]
    fn center_lands_on_translate() {
        let (x, y) = virginia().project(-79.6, 37.6);
        assert!((x - 600.0).abs() < 1e-9);
        assert!((y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn east_is_right_and_north_is_up() {
        let p = virginia();
        let (cx, cy) = p.project(-79.6, 37.6);
        let (ex, _) = p.project(-77.0, 37.6);
        let (_, ny) = p.project(-79.6, 39.0);
        assert!(ex > cx);
        assert!(ny < cy);
    }

    #[test]
    fn path_data_closes_each_ring() {
        let square = polygon![
            (x: -80.0, y: 37.0),
            (x: -79.0, y: 37.0),
            (x: -79.0, y: 38.0),
            (x: -80.0, y: 37.0),
        ];
        let d = virginia().path_data(&MultiPolygon::new(vec![square.clone(), square]));
        assert!(d.starts_with('M'));
        assert_eq!(d.matches('M').count(), 2);
        assert_eq!(d.matches('Z').count(), 2);
    }

    #[test]
    fn empty_geometry_has_empty_path() {
        assert_eq!(virginia().path_data(&MultiPolygon::new(vec![])), "");
    }
}
