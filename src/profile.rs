use anyhow::{bail, Context, Result};
use log::warn;
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::models::UserProfile;

/// JSON-file key/value store for the user's profile.
///
/// The user id is generated on first open and written straight away so it
/// stays stable across launches.
pub struct ProfileStore {
    path: PathBuf,
    data: RwLock<UserProfile>,
}

impl ProfileStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let (data, needs_persist) = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read profile from {}", path.display()))?;
            match serde_json::from_str::<serde_json::Value>(&contents) {
                Ok(value) => {
                    let stored_id = value
                        .get("userId")
                        .and_then(|id| id.as_str())
                        .filter(|id| !id.is_empty())
                        .map(str::to_owned);
                    match serde_json::from_value::<UserProfile>(value) {
                        Ok(mut profile) => {
                            if stored_id.is_none() {
                                profile.user_id = UserProfile::default().user_id;
                            }
                            (profile, stored_id.is_none())
                        }
                        Err(err) => {
                            warn!("Profile at {} is malformed ({err}); using defaults", path.display());
                            let mut profile = UserProfile::default();
                            if let Some(id) = stored_id {
                                profile.user_id = id;
                            }
                            // Rewrite so the next launch reads the same profile.
                            (profile, true)
                        }
                    }
                }
                Err(err) => {
                    warn!("Profile at {} is not JSON ({err}); using defaults", path.display());
                    (UserProfile::default(), true)
                }
            }
        } else {
            (UserProfile::default(), true)
        };

        let store = Self {
            path,
            data: RwLock::new(data),
        };
        if needs_persist {
            store.persist(&store.profile())?;
        }
        Ok(store)
    }

    pub fn profile(&self) -> UserProfile {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_weight(&self, weight_kg: f64) -> Result<()> {
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            bail!("weight must be a positive number of kilograms, got {weight_kg}");
        }
        self.update(|profile| profile.weight_kg = weight_kg)
    }

    pub fn set_height(&self, height_cm: f64) -> Result<()> {
        if !(height_cm.is_finite() && height_cm > 0.0) {
            bail!("height must be a positive number of centimeters, got {height_cm}");
        }
        self.update(|profile| profile.height_cm = height_cm)
    }

    pub fn set_age(&self, age_years: u32) -> Result<()> {
        self.update(|profile| profile.age_years = age_years)
    }

    fn update(&self, apply: impl FnOnce(&mut UserProfile)) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write profile to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserProfile = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_open_writes_defaults_with_generated_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let store = ProfileStore::new(path.clone()).unwrap();

        let profile = store.profile();
        assert_eq!(profile.weight_kg, 70.0);
        assert_eq!(profile.height_cm, 170.0);
        assert_eq!(profile.age_years, 25);
        assert!(uuid::Uuid::parse_str(&profile.user_id).is_ok());
        assert!(path.exists());

        let reopened = ProfileStore::new(path).unwrap();
        assert_eq!(reopened.profile().user_id, profile.user_id);
    }

    #[test]
    fn updates_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");
        let store = ProfileStore::new(path.clone()).unwrap();
        store.set_weight(82.5).unwrap();
        store.set_height(181.0).unwrap();
        store.set_age(40).unwrap();

        let reopened = ProfileStore::new(path).unwrap().profile();
        assert_eq!(reopened.weight_kg, 82.5);
        assert_eq!(reopened.height_cm, 181.0);
        assert_eq!(reopened.age_years, 40);
    }

    #[test]
    fn invalid_weight_is_refused_and_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json")).unwrap();
        assert!(store.set_weight(0.0).is_err());
        assert!(store.set_weight(f64::NAN).is_err());
        assert_eq!(store.profile().weight_kg, 70.0);
    }

    #[test]
    fn partial_file_keeps_known_fields_and_gains_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"weightKg": 64.0}"#).unwrap();

        let store = ProfileStore::new(path.clone()).unwrap();
        let profile = store.profile();
        assert_eq!(profile.weight_kg, 64.0);
        assert_eq!(profile.age_years, 25);

        store.reload().unwrap();
        assert_eq!(store.profile().user_id, profile.user_id);
    }

    #[test]
    fn malformed_field_keeps_the_stored_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"userId":"abc-123","weightKg":"heavy"}"#).unwrap();

        let first = ProfileStore::new(path.clone()).unwrap().profile();
        let second = ProfileStore::new(path.clone()).unwrap().profile();
        assert_eq!(first.user_id, "abc-123");
        assert_eq!(second.user_id, "abc-123");
        assert_eq!(second.weight_kg, 70.0);

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["userId"], "abc-123");
        assert_eq!(on_disk["weightKg"], 70.0);
    }

    #[test]
    fn garbage_file_gets_one_stable_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "not json").unwrap();

        let first = ProfileStore::new(path.clone()).unwrap().profile();
        let second = ProfileStore::new(path).unwrap().profile();
        assert_eq!(first.user_id, second.user_id);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "not json").unwrap();
        let store = ProfileStore::new(path).unwrap();
        assert_eq!(store.profile().weight_kg, 70.0);
    }
}
