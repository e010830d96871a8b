/// Great-circle distance and arrival estimates
///
/// Distances use the Haversine formula on a spherical Earth. Arrival times
/// assume an average urban speed of 30 km/h.

// Mean radius, kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average travel speed used for ETAs
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

/// Distance in kilometres between two WGS84 points
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whole minutes to cover `distance_km`, rounded down
pub fn eta_minutes(distance_km: f64) -> i32 {
    (distance_km / AVERAGE_SPEED_KMH * 60.0).floor() as i32
}

/// Latitude in -90..=90 and longitude in -180..=180
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// Distance and ETA from a position to a destination, when the destination is known
pub fn distance_and_eta(
    from: (f64, f64),
    to: Option<(f64, f64)>,
) -> Option<(f64, i32)> {
    let (lat, lon) = to?;
    let distance = haversine_km(from.0, from.1, lat, lon);
    Some((distance, eta_minutes(distance)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_km(5.36, -4.01, 5.36, -4.01), 0.0);
        assert_eq!(eta_minutes(0.0), 0);
    }

    #[test]
    fn test_abidjan_to_dakar() {
        // Abidjan (5.3600, -4.0083) to Dakar (14.7167, -17.4677): roughly 1,780 km
        let d = haversine_km(5.3600, -4.0083, 14.7167, -17.4677);
        assert!((1750.0..1810.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01);
    }

    #[test]
    fn test_eta_floors() {
        assert_eq!(eta_minutes(15.0), 30);
        assert_eq!(eta_minutes(2.49), 4);
        assert_eq!(eta_minutes(0.4), 0);
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(is_valid_coordinate(90.0, -180.0));
        assert!(!is_valid_coordinate(90.1, 0.0));
        assert!(!is_valid_coordinate(0.0, 180.5));
    }

    #[test]
    fn test_distance_and_eta_requires_destination() {
        assert!(distance_and_eta((5.0, -4.0), None).is_none());
        let (d, eta) = distance_and_eta((0.0, 0.0), Some((0.0, 0.0))).unwrap();
        assert_eq!((d, eta), (0.0, 0));
    }
}
