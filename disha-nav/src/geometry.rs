//! Planar centroids and geodesic lengths on `[lng, lat]` coordinates.

use crate::types::{Feature, Geometry, LngLat, Position};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Centre of mass of a geometry.
///
/// Polygons use the area centroid of their outer ring; multipolygons weight
/// each part by its area. Degenerate rings fall back to the vertex mean.
pub fn centroid(geometry: &Geometry) -> Option<LngLat> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::Polygon(rings) => rings.first().and_then(|ring| ring_centroid(ring)),
        Geometry::MultiPolygon(polygons) => {
            let mut area_sum = 0.0;
            let mut weighted = [0.0, 0.0];
            let mut fallback = Vec::new();
            for ring in polygons.iter().filter_map(|p| p.first()) {
                let area = ring_area(ring).abs();
                if let Some(c) = ring_centroid(ring) {
                    weighted[0] += c[0] * area;
                    weighted[1] += c[1] * area;
                    area_sum += area;
                    fallback.push(c);
                }
            }
            if area_sum > f64::EPSILON {
                Some([weighted[0] / area_sum, weighted[1] / area_sum])
            } else {
                vertex_mean(&fallback)
            }
        }
    }
}

/// Position at the centre of `feature`, on the feature's floor.
///
/// `None` when the feature has no floor or an empty geometry.
pub fn feature_position(feature: &Feature) -> Option<Position> {
    let [lng, lat] = centroid(&feature.geometry)?;
    let floor_id = feature.floor_id()?;
    Some(Position {
        lng,
        lat,
        floor_id: floor_id.to_string(),
        feature_id: Some(feature.id.clone()),
        properties: feature.properties.clone(),
    })
}

/// Great-circle distance between two points (meters).
pub fn haversine_m(a: LngLat, b: LngLat) -> f64 {
    let (lat1, lat2) = (a[1].to_radians(), b[1].to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b[0] - a[0]).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Length of a polyline (meters).
pub fn path_length_m(path: &[LngLat]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

/// Signed shoelace area of a ring in squared degrees.
fn ring_area(ring: &[LngLat]) -> f64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(p, q)| p[0] * q[1] - q[0] * p[1])
        .sum::<f64>()
        / 2.0
}

fn ring_centroid(ring: &[LngLat]) -> Option<LngLat> {
    if ring.is_empty() {
        return None;
    }
    // Shift to the first vertex to keep the products small
    let origin = ring[0];
    let local: Vec<LngLat> = ring
        .iter()
        .map(|p| [p[0] - origin[0], p[1] - origin[1]])
        .collect();

    let area = ring_area(&local);
    if area.abs() < f64::EPSILON {
        return vertex_mean(ring);
    }

    let (mut cx, mut cy) = (0.0, 0.0);
    for (p, q) in local.iter().zip(local.iter().cycle().skip(1)) {
        let cross = p[0] * q[1] - q[0] * p[1];
        cx += (p[0] + q[0]) * cross;
        cy += (p[1] + q[1]) * cross;
    }
    Some([
        origin[0] + cx / (6.0 * area),
        origin[1] + cy / (6.0 * area),
    ])
}

fn vertex_mean(points: &[LngLat]) -> Option<LngLat> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    Some([sx / n, sy / n])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, size: f64) -> Vec<LngLat> {
        vec![
            [x, y],
            [x + size, y],
            [x + size, y + size],
            [x, y + size],
            [x, y],
        ]
    }

    #[test]
    fn test_square_centroid() {
        let c = centroid(&Geometry::Polygon(vec![square(113.0, 23.0, 0.002)])).unwrap();
        assert_relative_eq!(c[0], 113.001, epsilon = 1e-9);
        assert_relative_eq!(c[1], 23.001, epsilon = 1e-9);
    }

    #[test]
    fn test_l_shape_is_not_vertex_mean() {
        // L-shaped room: the mass sits in the long leg
        let ring = vec![
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 1.0],
            [1.0, 1.0],
            [1.0, 3.0],
            [0.0, 3.0],
            [0.0, 0.0],
        ];
        let c = centroid(&Geometry::Polygon(vec![ring])).unwrap();
        assert_relative_eq!(c[0], 1.1, epsilon = 1e-9);
        assert_relative_eq!(c[1], 1.1, epsilon = 1e-9);
    }

    #[test]
    fn test_multipolygon_weighted_by_area() {
        let geometry = Geometry::MultiPolygon(vec![
            vec![square(0.0, 0.0, 2.0)],
            vec![square(10.0, 0.0, 1.0)],
        ]);
        let c = centroid(&geometry).unwrap();
        // (1 * 4 + 10.5 * 1) / 5
        assert_relative_eq!(c[0], 2.9, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_ring_falls_back() {
        let ring = vec![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let c = centroid(&Geometry::Polygon(vec![ring])).unwrap();
        assert_relative_eq!(c[0], 2.0);
        assert!(centroid(&Geometry::Polygon(vec![])).is_none());
    }

    #[test]
    fn test_feature_position_needs_floor() {
        let mut feature = Feature::new("r1", Geometry::Point([1.0, 2.0]));
        assert!(feature_position(&feature).is_none());
        feature.set_floor("F1");
        let pos = feature_position(&feature).unwrap();
        assert_eq!(pos.floor_id, "F1");
        assert_eq!(pos.feature_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_m([0.0, 0.0], [0.0, 1.0]);
        assert_relative_eq!(d, 111_195.08, epsilon = 1.0);
    }

    #[test]
    fn test_path_length() {
        assert_eq!(path_length_m(&[]), 0.0);
        assert_eq!(path_length_m(&[[1.0, 1.0]]), 0.0);
        let path = [[0.0, 0.0], [0.0, 0.001], [0.0, 0.002]];
        assert_relative_eq!(
            path_length_m(&path),
            2.0 * haversine_m([0.0, 0.0], [0.0, 0.001]),
            epsilon = 1e-6
        );
    }
}
