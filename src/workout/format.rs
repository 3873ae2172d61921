/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_duration(millis: u64) -> String {
    let total_seconds = millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn format_distance(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}

pub fn format_calories(kcal: f64) -> String {
    format!("{kcal:.0} kcal")
}

pub fn format_pace(kmh: f64) -> String {
    format!("{kmh:.2} km/h")
}
