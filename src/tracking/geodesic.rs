use geo::{Distance, Haversine, Point};

use crate::models::{PositionSample, RoutePoint};

/// Haversine distance between two points in meters.
pub fn distance_meters(from: &RoutePoint, to: &RoutePoint) -> f64 {
    let origin = Point::new(from.longitude, from.latitude);
    let destination = Point::new(to.longitude, to.latitude);
    Haversine::distance(origin, destination)
}

pub fn sample_distance_meters(from: &PositionSample, to: &PositionSample) -> f64 {
    distance_meters(&from.route_point(), &to.route_point())
}

/// Sum of consecutive point distances along a route.
pub fn path_length_meters(points: &[RoutePoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_meters(&pair[0], &pair[1]))
        .sum()
}
