use crate::Coordinates;

/// Mean Earth radius, in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres
///
/// Haversine formula over a spherical Earth; accurate to well under a
/// percent, which is plenty for proximity scoring.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let point = Coordinates {
            lat: 33.6844,
            lng: 73.0479,
        };

        assert_eq!(haversine_km(&point, &point), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let islamabad = Coordinates {
            lat: 33.6844,
            lng: 73.0479,
        };
        let lahore = Coordinates {
            lat: 31.5204,
            lng: 74.3587,
        };

        assert_eq!(
            haversine_km(&islamabad, &lahore),
            haversine_km(&lahore, &islamabad)
        );
    }

    #[test]
    fn known_distance_is_plausible() {
        let islamabad = Coordinates {
            lat: 33.6844,
            lng: 73.0479,
        };
        let lahore = Coordinates {
            lat: 31.5204,
            lng: 74.3587,
        };

        // Roughly 270 km apart as the crow flies
        let distance = haversine_km(&islamabad, &lahore);
        assert!(distance > 250.0 && distance < 290.0);
    }
}
