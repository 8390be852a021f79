//! Connection profiles: the remote hosts sessions are opened against.
//!
//! [`ProfileStore`] keeps profiles in display order with an id index, and is
//! persisted as a YAML list (`connections.yaml` in the config directory).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use termweave_protocol::AuthType;
use uuid::Uuid;

/// Unique identifier for a connection profile
pub type ProfileId = Uuid;

/// A saved remote host with the credentials needed to open a terminal on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub id: ProfileId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl ConnectionProfile {
    /// `user@host:port`
    pub fn display_label(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            password: self.password.clone(),
            private_key: self.private_key.clone(),
        }
    }
}

/// Editable fields of a profile, as entered by the user.
///
/// Only the credential matching `auth_type` is kept when the form is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth_type: AuthType,
    pub password: String,
    pub private_key: String,
}

impl ProfileForm {
    fn password_field(&self) -> Option<String> {
        (self.auth_type == AuthType::Password).then(|| self.password.clone())
    }

    fn private_key_field(&self) -> Option<String> {
        (self.auth_type == AuthType::PrivateKey).then(|| self.private_key.clone())
    }
}

/// Secret material attached to a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub password: Option<String>,
    pub private_key: Option<String>,
}

/// Ordered collection of connection profiles
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    /// All profiles indexed by ID
    profiles: HashMap<ProfileId, ConnectionProfile>,

    /// Ordered list of profile IDs for display
    order: Vec<ProfileId>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an ordered list, dropping duplicate ids
    pub fn from_profiles(profiles: Vec<ConnectionProfile>) -> Self {
        let mut store = Self::new();
        for profile in profiles {
            if store.contains(&profile.id) {
                log::warn!("Duplicate connection profile id {} ignored", profile.id);
                continue;
            }
            store.insert(profile);
        }
        store
    }

    /// Load profiles from `path`.
    ///
    /// A missing or empty file yields an empty store; an unreadable or corrupt
    /// file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No connection profiles at {:?}", path);
            return Ok(Self::new());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read connection profiles {:?}", path))?;
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }

        let profiles: Vec<ConnectionProfile> = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse connection profiles {:?}", path))?;
        log::info!("Loaded {} connection profiles from {:?}", profiles.len(), path);
        Ok(Self::from_profiles(profiles))
    }

    /// Write profiles to `path` in display order
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let yaml = serde_yaml_ng::to_string(&self.to_vec())
            .context("Failed to serialize connection profiles")?;
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml)
            .with_context(|| format!("Failed to write {:?}", temp_path))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move profiles into place at {:?}", path))?;
        Ok(())
    }

    fn insert(&mut self, profile: ConnectionProfile) {
        let id = profile.id;
        if !self.order.contains(&id) {
            self.order.push(id);
        }
        self.profiles.insert(id, profile);
    }

    /// Create a profile from a form and append it
    pub fn add(&mut self, form: ProfileForm) -> ConnectionProfile {
        let profile = ConnectionProfile {
            id: Uuid::new_v4(),
            password: form.password_field(),
            private_key: form.private_key_field(),
            name: form.name,
            host: form.host,
            port: form.port,
            username: form.username,
            auth_type: form.auth_type,
            created_at: Utc::now(),
            last_connected_at: None,
        };
        self.insert(profile.clone());
        profile
    }

    /// Apply a form to an existing profile. Returns false if `id` is unknown.
    pub fn update(&mut self, id: &ProfileId, form: ProfileForm) -> bool {
        let Some(profile) = self.profiles.get_mut(id) else {
            return false;
        };
        profile.password = form.password_field();
        profile.private_key = form.private_key_field();
        profile.name = form.name;
        profile.host = form.host;
        profile.port = form.port;
        profile.username = form.username;
        profile.auth_type = form.auth_type;
        true
    }

    pub fn remove(&mut self, id: &ProfileId) -> Option<ConnectionProfile> {
        self.order.retain(|pid| pid != id);
        self.profiles.remove(id)
    }

    pub fn get(&self, id: &ProfileId) -> Option<&ConnectionProfile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.profiles.contains_key(id)
    }

    /// Look up by id string or, failing that, by case-insensitive name
    pub fn resolve(&self, id_or_name: &str) -> Option<&ConnectionProfile> {
        if let Ok(id) = Uuid::parse_str(id_or_name.trim())
            && let Some(profile) = self.profiles.get(&id)
        {
            return Some(profile);
        }
        let lower = id_or_name.trim().to_lowercase();
        self.iter().find(|p| p.name.to_lowercase() == lower)
    }

    /// Stamp the profile as connected now
    pub fn touch_last_connected(&mut self, id: &ProfileId) -> bool {
        match self.profiles.get_mut(id) {
            Some(profile) => {
                profile.last_connected_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub fn credentials(&self, id: &ProfileId) -> Option<Credentials> {
        self.profiles.get(id).map(ConnectionProfile::credentials)
    }

    /// Overwrite whichever credential fields are `Some`
    pub fn set_credentials(
        &mut self,
        id: &ProfileId,
        password: Option<String>,
        private_key: Option<String>,
    ) -> bool {
        let Some(profile) = self.profiles.get_mut(id) else {
            return false;
        };
        if password.is_some() {
            profile.password = password;
        }
        if private_key.is_some() {
            profile.private_key = private_key;
        }
        true
    }

    pub fn clear_credentials(&mut self, id: &ProfileId) -> bool {
        let Some(profile) = self.profiles.get_mut(id) else {
            return false;
        };
        profile.password = None;
        profile.private_key = None;
        true
    }

    /// Profiles in display order
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionProfile> {
        self.order.iter().filter_map(|id| self.profiles.get(id))
    }

    pub fn to_vec(&self) -> Vec<ConnectionProfile> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn password_form(name: &str) -> ProfileForm {
        ProfileForm {
            name: name.to_string(),
            host: "10.0.0.7".to_string(),
            port: 22,
            username: "deploy".to_string(),
            auth_type: AuthType::Password,
            password: "hunter2".to_string(),
            private_key: "should-not-be-kept".to_string(),
        }
    }

    #[test]
    fn test_add_keeps_only_matching_credential() {
        let mut store = ProfileStore::new();
        let profile = store.add(password_form("web"));

        assert_eq!(profile.password.as_deref(), Some("hunter2"));
        assert_eq!(profile.private_key, None);
        assert!(store.contains(&profile.id));
        assert_eq!(profile.display_label(), "deploy@10.0.0.7:22");
    }

    #[test]
    fn test_update_switches_auth_type() {
        let mut store = ProfileStore::new();
        let id = store.add(password_form("web")).id;

        let form = ProfileForm {
            auth_type: AuthType::PrivateKey,
            private_key: "-----BEGIN KEY-----".to_string(),
            ..password_form("web-key")
        };
        assert!(store.update(&id, form));

        let profile = store.get(&id).unwrap();
        assert_eq!(profile.name, "web-key");
        assert_eq!(profile.password, None);
        assert_eq!(profile.private_key.as_deref(), Some("-----BEGIN KEY-----"));
        assert!(!store.update(&Uuid::new_v4(), password_form("ghost")));
    }

    #[test]
    fn test_remove_preserves_order_of_rest() {
        let mut store = ProfileStore::new();
        let a = store.add(password_form("a")).id;
        let b = store.add(password_form("b")).id;
        let c = store.add(password_form("c")).id;

        assert!(store.remove(&b).is_some());
        let ids: Vec<_> = store.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert!(store.remove(&b).is_none());
    }

    #[test]
    fn test_credentials_helpers() {
        let mut store = ProfileStore::new();
        let id = store.add(password_form("web")).id;

        assert!(store.set_credentials(&id, None, Some("key".to_string())));
        let creds = store.credentials(&id).unwrap();
        assert_eq!(creds.password.as_deref(), Some("hunter2"));
        assert_eq!(creds.private_key.as_deref(), Some("key"));

        assert!(store.clear_credentials(&id));
        assert_eq!(store.credentials(&id).unwrap(), Credentials::default());
        assert!(store.credentials(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_touch_last_connected() {
        let mut store = ProfileStore::new();
        let id = store.add(password_form("web")).id;
        assert!(store.get(&id).unwrap().last_connected_at.is_none());

        assert!(store.touch_last_connected(&id));
        assert!(store.get(&id).unwrap().last_connected_at.is_some());
        assert!(!store.touch_last_connected(&Uuid::new_v4()));
    }

    #[test]
    fn test_resolve_by_id_or_name() {
        let mut store = ProfileStore::new();
        let id = store.add(password_form("Staging")).id;

        assert_eq!(store.resolve(&id.to_string()).unwrap().id, id);
        assert_eq!(store.resolve("staging").unwrap().id, id);
        assert!(store.resolve("prod").is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("connections.yaml");

        let mut store = ProfileStore::new();
        let first = store.add(password_form("first")).id;
        let second = store.add(password_form("second")).id;
        store.save_to(&path).unwrap();

        let loaded = ProfileStore::load_from(&path).unwrap();
        let ids: Vec<_> = loaded.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(loaded.get(&first), store.get(&first));
    }

    #[test]
    fn test_load_missing_and_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("connections.yaml");
        assert!(ProfileStore::load_from(&path).unwrap().is_empty());

        fs::write(&path, "   \n").unwrap();
        assert!(ProfileStore::load_from(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("connections.yaml");
        fs::write(&path, "- id: not-a-uuid\n  name: [").unwrap();
        assert!(ProfileStore::load_from(&path).is_err());
    }

    #[test]
    fn test_from_profiles_drops_duplicates() {
        let mut store = ProfileStore::new();
        let profile = store.add(password_form("web"));
        let rebuilt = ProfileStore::from_profiles(vec![profile.clone(), profile]);
        assert_eq!(rebuilt.len(), 1);
    }
}
