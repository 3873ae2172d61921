use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_AGE_YEARS: u32 = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub user_id: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age_years: u32,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            weight_kg: DEFAULT_WEIGHT_KG,
            height_cm: DEFAULT_HEIGHT_CM,
            age_years: DEFAULT_AGE_YEARS,
        }
    }
}
