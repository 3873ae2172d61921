/// Durations shorter than this report zero calories and pace.
pub const MIN_METRIC_DURATION_MS: u64 = 1_000;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// MET value for a given average speed, stepping from walking to running.
pub fn met_for_speed(speed_kmh: f64) -> f64 {
    if speed_kmh <= 4.0 {
        2.0
    } else if speed_kmh <= 8.0 {
        7.0
    } else if speed_kmh <= 11.0 {
        8.5
    } else {
        10.0
    }
}

pub fn calories_kcal(weight_kg: f64, distance_meters: f64, duration_ms: u64) -> f64 {
    if duration_ms < MIN_METRIC_DURATION_MS {
        return 0.0;
    }
    let hours = duration_ms as f64 / MS_PER_HOUR;
    let speed_kmh = (distance_meters / 1000.0) / hours;
    met_for_speed(speed_kmh) * weight_kg * hours
}

/// Average speed in km/h.
pub fn average_pace_kmh(distance_meters: f64, duration_ms: u64) -> f64 {
    if duration_ms < MIN_METRIC_DURATION_MS || distance_meters <= 0.0 {
        return 0.0;
    }
    (distance_meters / 1000.0) / (duration_ms as f64 / MS_PER_HOUR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn met_steps_are_inclusive_at_upper_bounds() {
        assert_eq!(met_for_speed(0.0), 2.0);
        assert_eq!(met_for_speed(4.0), 2.0);
        assert_eq!(met_for_speed(4.01), 7.0);
        assert_eq!(met_for_speed(8.0), 7.0);
        assert_eq!(met_for_speed(11.0), 8.5);
        assert_eq!(met_for_speed(11.5), 10.0);
    }

    #[test]
    fn sub_second_duration_reports_zero() {
        assert_eq!(calories_kcal(70.0, 500.0, 999), 0.0);
        assert_eq!(average_pace_kmh(500.0, 999), 0.0);
    }

    #[test]
    fn standing_still_burns_resting_met() {
        // One hour, no distance: MET 2.0 * 70kg * 1h.
        assert!((calories_kcal(70.0, 0.0, 3_600_000) - 140.0).abs() < 1e-9);
        assert_eq!(average_pace_kmh(0.0, 3_600_000), 0.0);
    }

    #[test]
    fn ten_k_in_an_hour() {
        let calories = calories_kcal(80.0, 10_000.0, 3_600_000);
        assert!((calories - 8.5 * 80.0).abs() < 1e-9);
        assert!((average_pace_kmh(10_000.0, 3_600_000) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn half_hour_jog() {
        // 3km in 30 minutes is 6 km/h.
        assert!((average_pace_kmh(3_000.0, 1_800_000) - 6.0).abs() < 1e-9);
        assert!((calories_kcal(70.0, 3_000.0, 1_800_000) - 7.0 * 70.0 * 0.5).abs() < 1e-9);
    }
}
