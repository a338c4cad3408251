use geo::Point;

/// The radius of the Earth used by every distance calculation, in km.
/// Slightly smaller than the usual mean radius; kept so distances agree
/// with the ones the device itself reports.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

pub const METRES_PER_KM: f64 = 1000.0;
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Great-circle distance in km between two points given in decimal
/// degrees, using the haversine formula. Inputs are trusted to be in
/// range.
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );

    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Great-circle distance in km between two geo-Points (x=lon, y=lat).
pub fn distance_km(p1: Point, p2: Point) -> f64 {
    haversine_km(p1.x(), p1.y(), p2.x(), p2.y())
}
