use crate::config::DefaultProxyConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mask shown in place of a stored password
pub const REDACTED: &str = "********";

/// A stored proxy identity
///
/// Owned by the registry and only mutated through its operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEntry {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl ProxyEntry {
    /// Proxy URL without credentials, e.g. `http://proxy.example.com:8080`
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Whether this entry routes traffic anywhere but directly
    pub fn has_endpoint(&self) -> bool {
        !self.host.is_empty()
    }

    pub fn view(&self) -> ProxyView {
        ProxyView {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            password: if self.password.is_empty() {
                String::new()
            } else {
                REDACTED.to_string()
            },
            host: self.host.clone(),
            port: self.port,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by.clone(),
        }
    }
}

/// Credential-redacted view of a proxy, safe to hand to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

/// Input for creating a proxy
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySpec {
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for ProxySpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            username: String::new(),
            password: String::new(),
            host: String::new(),
            port: 0,
            active: default_active(),
        }
    }
}

impl From<&DefaultProxyConfig> for ProxySpec {
    fn from(config: &DefaultProxyConfig) -> Self {
        Self {
            name: config.name.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            host: config.host.clone(),
            port: config.port,
            active: true,
        }
    }
}

/// Partial update for a proxy
///
/// Absent fields, empty strings and a zero port all leave the stored value
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub active: Option<bool>,
}

impl ProxyUpdate {
    /// Merges the present fields into `entry`, returning whether anything changed
    pub(crate) fn apply_to(&self, entry: &mut ProxyEntry) -> bool {
        let mut changed = false;

        changed |= merge_text(&mut entry.name, self.name.as_deref());
        changed |= merge_text(&mut entry.username, self.username.as_deref());
        changed |= merge_text(&mut entry.password, self.password.as_deref());
        changed |= merge_text(&mut entry.host, self.host.as_deref());

        if let Some(port) = self.port.filter(|p| *p != 0) {
            changed |= entry.port != port;
            entry.port = port;
        }
        if let Some(active) = self.active {
            changed |= entry.active != active;
            entry.active = active;
        }

        changed
    }
}

fn merge_text(slot: &mut String, value: Option<&str>) -> bool {
    match value {
        Some(v) if !v.is_empty() && slot != v => {
            *slot = v.to_string();
            true
        }
        _ => false,
    }
}
