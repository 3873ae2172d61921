use serde::{Deserialize, Serialize};

/// One raw fix from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, as reported by the provider.
    pub accuracy_meters: f64,
    pub timestamp_millis: i64,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, timestamp_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            timestamp_millis,
        }
    }

    pub fn route_point(&self) -> RoutePoint {
        RoutePoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Finite coordinates inside the WGS84 latitude/longitude ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl RoutePoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
