//! Great-circle distance helpers.
//!
//! The primary "nearest point" path is the PostGIS-backed query in
//! `db::collection_point`; this module is the in-memory fallback used when a
//! point list is already at hand. Haversine (spherical model) and the
//! server's geography (ellipsoidal) distances disagree by a few meters over
//! city-scale distances, which callers treat as equivalent.

use crate::models::CollectionPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinate pairs, in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Pick the point closest to the origin from an in-memory list.
///
/// Returns the point and its distance in meters, or `None` for an empty list.
/// Ties keep the first point encountered (stable scan in input order).
pub fn find_nearest(lat: f64, lon: f64, points: &[CollectionPoint]) -> Option<(&CollectionPoint, f64)> {
    let mut nearest: Option<(&CollectionPoint, f64)> = None;

    for point in points {
        let distance = haversine_distance(lat, lon, point.latitude, point.longitude);
        match nearest {
            Some((_, best)) if distance >= best => {}
            _ => nearest = Some((point, distance)),
        }
    }

    nearest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: i32, latitude: f64, longitude: f64) -> CollectionPoint {
        CollectionPoint {
            id,
            name: format!("Punto {id}"),
            description: None,
            address: None,
            point_type: Some("contenedor".to_string()),
            capacity: Some(100),
            current_fill: 0,
            waste_types: None,
            longitude,
            latitude,
            operating_hours: None,
            contact_phone: None,
            contact_email: None,
            is_active: true,
            image_url: None,
            created_at: None,
            updated_at: None,
            distance: None,
        }
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_identity() {
        let (lat1, lon1) = (-0.9322, -78.6155);
        let (lat2, lon2) = (-0.9350, -78.6200);

        assert_eq!(haversine_distance(lat1, lon1, lat1, lon1), 0.0);
        let forward = haversine_distance(lat1, lon1, lat2, lon2);
        let backward = haversine_distance(lat2, lon2, lat1, lon1);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn distance_matches_known_references() {
        // One degree of longitude on the equator is ~111.2 km.
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 500.0);

        // Quito to Latacunga is roughly 85 km as the crow flies.
        let d = haversine_distance(-0.1807, -78.4678, -0.9322, -78.6155);
        assert!((60_000.0..90_000.0).contains(&d));
    }

    #[test]
    fn nearest_prefers_the_closer_point() {
        // Origin in central Latacunga; one point ~500 m north, one ~5 km north.
        // 1 degree of latitude ~ 111.32 km.
        let origin = (-0.9322, -78.6155);
        let near = point(1, origin.0 + 500.0 / 111_320.0, origin.1);
        let far = point(2, origin.0 + 5000.0 / 111_320.0, origin.1);

        let points = vec![far.clone(), near.clone()];
        let (found, distance) = find_nearest(origin.0, origin.1, &points).unwrap();
        assert_eq!(found.id, near.id);
        assert!((distance - 500.0).abs() < 5.0);

        let far_distance = haversine_distance(origin.0, origin.1, far.latitude, far.longitude);
        assert!((far_distance - 5000.0).abs() < 20.0);
    }

    #[test]
    fn nearest_is_none_on_empty_list() {
        assert!(find_nearest(-0.9322, -78.6155, &[]).is_none());
    }

    #[test]
    fn ties_keep_input_order() {
        let origin = (-0.9322, -78.6155);
        let a = point(10, origin.0 + 0.001, origin.1);
        let b = point(20, origin.0 - 0.001, origin.1);

        let points = [a, b];
        let (found, _) = find_nearest(origin.0, origin.1, &points).unwrap();
        assert_eq!(found.id, 10);
    }
}
