use crate::proxy::{
    ProxyEntry, ProxySpec, ProxyUpdate, ProxyView, ReqwestTransportFactory, TransportFactory,
};
use crate::{ProxyError, ProxyResult};
use chrono::Utc;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use uuid::Uuid;

/// Id of the always-present, non-deletable default proxy
pub const DEFAULT_PROXY_ID: &str = "default";

/// Creator recorded on the default proxy
const SYSTEM_CREATOR: &str = "system";

/// An outbound client resolved for one caller
#[derive(Debug, Clone)]
pub struct ResolvedTransport {
    pub client: Client,

    /// Proxy the client routes through; `None` for a direct connection
    pub proxy_id: Option<String>,
}

impl ResolvedTransport {
    pub fn is_direct(&self) -> bool {
        self.proxy_id.is_none()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    proxies: HashMap<String, ProxyEntry>,
    /// username -> proxy id
    assignments: HashMap<String, String>,
}

/// Store of proxy identities and per-user assignments
///
/// Proxies and assignments share one reader/writer lock so cascading
/// deletes are atomic. Client construction happens after the lock is
/// released.
pub struct ProxyRegistry {
    state: RwLock<RegistryState>,
    factory: Arc<dyn TransportFactory>,
    timeout: Duration,
}

impl ProxyRegistry {
    /// Creates a registry seeded with the default proxy, using reqwest clients
    pub fn new(default: ProxySpec, timeout: Duration) -> Self {
        Self::with_factory(default, Arc::new(ReqwestTransportFactory::new()), timeout)
    }

    /// Creates a registry with a custom transport factory
    pub fn with_factory(
        default: ProxySpec,
        factory: Arc<dyn TransportFactory>,
        timeout: Duration,
    ) -> Self {
        let now = Utc::now();
        let entry = ProxyEntry {
            id: DEFAULT_PROXY_ID.to_string(),
            name: default.name,
            username: default.username,
            password: default.password,
            host: default.host,
            port: default.port,
            active: true,
            created_at: now,
            updated_at: now,
            created_by: SYSTEM_CREATOR.to_string(),
        };

        let mut state = RegistryState::default();
        state.proxies.insert(entry.id.clone(), entry);

        Self {
            state: RwLock::new(state),
            factory,
            timeout,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a proxy and returns its redacted view
    pub fn create(&self, spec: ProxySpec, creator: &str) -> ProxyResult<ProxyView> {
        validate_spec(&spec)?;

        let now = Utc::now();
        let entry = ProxyEntry {
            id: Uuid::new_v4().to_string(),
            name: spec.name,
            username: spec.username,
            password: spec.password,
            host: spec.host,
            port: spec.port,
            active: spec.active,
            created_at: now,
            updated_at: now,
            created_by: creator.to_string(),
        };
        let view = entry.view();

        self.write().proxies.insert(entry.id.clone(), entry);
        tracing::info!("Created proxy {} ({}) by {}", view.id, view.name, creator);

        Ok(view)
    }

    pub fn get(&self, id: &str) -> ProxyResult<ProxyView> {
        self.read()
            .proxies
            .get(id)
            .map(ProxyEntry::view)
            .ok_or_else(|| ProxyError::NotFound(id.to_string()))
    }

    /// All proxies, default first, then by creation time
    pub fn list(&self) -> Vec<ProxyView> {
        let mut views: Vec<ProxyView> =
            self.read().proxies.values().map(ProxyEntry::view).collect();
        views.sort_by(|a, b| {
            (b.id == DEFAULT_PROXY_ID)
                .cmp(&(a.id == DEFAULT_PROXY_ID))
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        views
    }

    /// Merges the present fields of `update` into a proxy
    ///
    /// The default proxy may be edited but not deactivated.
    pub fn update(&self, id: &str, update: ProxyUpdate) -> ProxyResult<ProxyView> {
        if id == DEFAULT_PROXY_ID && update.active == Some(false) {
            return Err(ProxyError::IsDefault);
        }

        let mut state = self.write();
        let entry = state
            .proxies
            .get_mut(id)
            .ok_or_else(|| ProxyError::NotFound(id.to_string()))?;

        if update.apply_to(entry) {
            entry.updated_at = Utc::now();
            tracing::info!("Updated proxy {}", id);
        }

        Ok(entry.view())
    }

    /// Removes a proxy and every assignment that points at it
    ///
    /// Returns the number of assignments removed.
    pub fn delete(&self, id: &str) -> ProxyResult<usize> {
        if id == DEFAULT_PROXY_ID {
            return Err(ProxyError::IsDefault);
        }

        let mut state = self.write();
        if state.proxies.remove(id).is_none() {
            return Err(ProxyError::NotFound(id.to_string()));
        }

        let before = state.assignments.len();
        state.assignments.retain(|_, proxy_id| proxy_id != id);
        let removed = before - state.assignments.len();

        tracing::info!("Deleted proxy {} ({} assignments cleared)", id, removed);
        Ok(removed)
    }

    /// Assigns `user` to an existing, active proxy
    pub fn assign(&self, user: &str, proxy_id: &str) -> ProxyResult<()> {
        let mut state = self.write();
        match state.proxies.get(proxy_id) {
            None => return Err(ProxyError::NotFound(proxy_id.to_string())),
            Some(entry) if !entry.active => {
                return Err(ProxyError::Inactive(proxy_id.to_string()))
            }
            Some(_) => {}
        }

        state
            .assignments
            .insert(user.to_string(), proxy_id.to_string());
        tracing::debug!("Assigned {} to proxy {}", user, proxy_id);
        Ok(())
    }

    /// Removes the assignment for `user`; returns whether one existed
    pub fn unassign(&self, user: &str) -> bool {
        self.write().assignments.remove(user).is_some()
    }

    /// The proxy id explicitly assigned to `user`, if any
    pub fn assignment(&self, user: &str) -> Option<String> {
        self.read().assignments.get(user).cloned()
    }

    /// Every explicit assignment, keyed by user
    pub fn assignments(&self) -> BTreeMap<String, String> {
        self.read()
            .assignments
            .iter()
            .map(|(user, id)| (user.clone(), id.clone()))
            .collect()
    }

    /// The entry `user` should use: the assigned proxy if it still exists and
    /// is active, otherwise the default
    pub fn resolve_entry(&self, user: &str) -> ProxyEntry {
        let state = self.read();

        let assigned = state
            .assignments
            .get(user)
            .and_then(|id| state.proxies.get(id))
            .filter(|entry| entry.active);

        match assigned {
            Some(entry) => entry.clone(),
            None => state
                .proxies
                .get(DEFAULT_PROXY_ID)
                .cloned()
                .unwrap_or_else(unreachable_default),
        }
    }

    /// Builds an outbound client for `user`
    ///
    /// Never fails: any construction error falls back to a direct client.
    pub fn resolve_transport(&self, user: &str) -> ResolvedTransport {
        let entry = self.resolve_entry(user);

        if !entry.has_endpoint() {
            return ResolvedTransport {
                client: self.factory.direct(self.timeout),
                proxy_id: None,
            };
        }

        match self.factory.build(&entry, self.timeout) {
            Ok(client) => ResolvedTransport {
                client,
                proxy_id: Some(entry.id),
            },
            Err(e) => {
                tracing::warn!(
                    "Falling back to direct connection for {} (proxy {}): {}",
                    user,
                    entry.id,
                    e
                );
                ResolvedTransport {
                    client: self.factory.direct(self.timeout),
                    proxy_id: None,
                }
            }
        }
    }
}

/// The default entry is inserted at construction and can never be removed
fn unreachable_default() -> ProxyEntry {
    tracing::error!("Default proxy missing from registry; using a direct identity");
    let now = Utc::now();
    ProxyEntry {
        id: DEFAULT_PROXY_ID.to_string(),
        name: DEFAULT_PROXY_ID.to_string(),
        username: String::new(),
        password: String::new(),
        host: String::new(),
        port: 0,
        active: true,
        created_at: now,
        updated_at: now,
        created_by: SYSTEM_CREATOR.to_string(),
    }
}

fn validate_spec(spec: &ProxySpec) -> ProxyResult<()> {
    if spec.name.trim().is_empty() {
        return Err(ProxyError::Invalid("name cannot be empty".to_string()));
    }
    if spec.host.trim().is_empty() {
        return Err(ProxyError::Invalid("host cannot be empty".to_string()));
    }
    if spec.port == 0 {
        return Err(ProxyError::Invalid("port cannot be 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::TransportError;
    use std::sync::Mutex;

    /// Records every entry it is asked to build a client for
    #[derive(Default)]
    struct RecordingFactory {
        built: Mutex<Vec<ProxyEntry>>,
        fail: bool,
    }

    impl TransportFactory for RecordingFactory {
        fn build(&self, proxy: &ProxyEntry, _timeout: Duration) -> Result<Client, TransportError> {
            self.built.lock().unwrap().push(proxy.clone());
            if self.fail {
                Err(TransportError::InvalidProxy {
                    id: proxy.id.clone(),
                    reason: "refused by test".to_string(),
                })
            } else {
                Ok(Client::new())
            }
        }

        fn direct(&self, _timeout: Duration) -> Client {
            Client::new()
        }
    }

    fn default_spec() -> ProxySpec {
        ProxySpec {
            name: "default".to_string(),
            username: "default-user".to_string(),
            password: "default-pass".to_string(),
            host: "default.proxy".to_string(),
            port: 8080,
            active: true,
        }
    }

    fn spec(name: &str) -> ProxySpec {
        ProxySpec {
            name: name.to_string(),
            username: format!("{}-user", name),
            password: format!("{}-pass", name),
            host: format!("{}.proxy", name),
            port: 3128,
            active: true,
        }
    }

    fn registry() -> (ProxyRegistry, Arc<RecordingFactory>) {
        let factory = Arc::new(RecordingFactory::default());
        let registry =
            ProxyRegistry::with_factory(default_spec(), factory.clone(), Duration::from_secs(30));
        (registry, factory)
    }

    #[test]
    fn test_default_proxy_exists() {
        let (registry, _) = registry();
        let view = registry.get(DEFAULT_PROXY_ID).unwrap();
        assert_eq!(view.host, "default.proxy");
        assert_eq!(view.created_by, "system");
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_create_get_list() {
        let (registry, _) = registry();
        let created = registry.create(spec("eu"), "alice").unwrap();

        assert_ne!(created.id, DEFAULT_PROXY_ID);
        assert_eq!(created.created_by, "alice");
        assert_eq!(registry.get(&created.id).unwrap(), created);

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, DEFAULT_PROXY_ID);
        assert_eq!(listed[1].id, created.id);
    }

    #[test]
    fn test_views_never_expose_passwords() {
        let (registry, _) = registry();
        let created = registry.create(spec("eu"), "alice").unwrap();

        for view in registry.list() {
            assert!(!view.password.contains("pass"));
        }
        assert_eq!(created.password, crate::proxy::REDACTED);
    }

    #[test]
    fn test_create_rejects_incomplete_spec() {
        let (registry, _) = registry();
        let mut bad = spec("eu");
        bad.host.clear();
        assert!(matches!(
            registry.create(bad, "alice"),
            Err(ProxyError::Invalid(_))
        ));
    }

    #[test]
    fn test_get_unknown() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.get("missing"),
            Err(ProxyError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_with_empty_fields_keeps_stored_values() {
        let (registry, _) = registry();
        let created = registry.create(spec("eu"), "alice").unwrap();

        let updated = registry
            .update(
                &created.id,
                ProxyUpdate {
                    name: Some(String::new()),
                    host: Some(String::new()),
                    ..ProxyUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "eu");
        assert_eq!(updated.host, "eu.proxy");
        assert_eq!(updated.updated_at, created.updated_at);
    }

    #[test]
    fn test_update_bumps_timestamp() {
        let (registry, _) = registry();
        let created = registry.create(spec("eu"), "alice").unwrap();

        let updated = registry
            .update(
                &created.id,
                ProxyUpdate {
                    port: Some(9999),
                    ..ProxyUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.port, 9999);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_default_cannot_be_deactivated() {
        let (registry, _) = registry();
        let result = registry.update(
            DEFAULT_PROXY_ID,
            ProxyUpdate {
                active: Some(false),
                ..ProxyUpdate::default()
            },
        );
        assert!(matches!(result, Err(ProxyError::IsDefault)));

        let renamed = registry
            .update(
                DEFAULT_PROXY_ID,
                ProxyUpdate {
                    host: Some("new.default".to_string()),
                    ..ProxyUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.host, "new.default");
    }

    #[test]
    fn test_delete_default_always_fails() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.delete(DEFAULT_PROXY_ID),
            Err(ProxyError::IsDefault)
        ));
        assert!(registry.get(DEFAULT_PROXY_ID).is_ok());
    }

    #[test]
    fn test_delete_unknown() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.delete("missing"),
            Err(ProxyError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_cascades_assignments() {
        let (registry, _) = registry();
        let eu = registry.create(spec("eu"), "alice").unwrap();
        let us = registry.create(spec("us"), "alice").unwrap();

        registry.assign("bob", &eu.id).unwrap();
        registry.assign("carol", &eu.id).unwrap();
        registry.assign("dave", &us.id).unwrap();

        assert_eq!(registry.delete(&eu.id).unwrap(), 2);
        assert!(registry.get(&eu.id).is_err());

        let remaining = registry.assignments();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.get("dave"), Some(&us.id));
        assert_eq!(registry.assignment("bob"), None);
    }

    #[test]
    fn test_assign_requires_known_active_proxy() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.assign("bob", "missing"),
            Err(ProxyError::NotFound(_))
        ));

        let mut inactive = spec("cold");
        inactive.active = false;
        let cold = registry.create(inactive, "alice").unwrap();
        assert!(matches!(
            registry.assign("bob", &cold.id),
            Err(ProxyError::Inactive(_))
        ));
        assert_eq!(registry.assignment("bob"), None);
    }

    #[test]
    fn test_unassign_is_idempotent() {
        let (registry, _) = registry();
        let eu = registry.create(spec("eu"), "alice").unwrap();
        registry.assign("bob", &eu.id).unwrap();

        assert!(registry.unassign("bob"));
        assert!(!registry.unassign("bob"));
        assert!(!registry.unassign("never-assigned"));
    }

    #[test]
    fn test_unassigned_user_resolves_to_default_credentials() {
        let (registry, factory) = registry();

        let resolved = registry.resolve_transport("nobody");
        assert_eq!(resolved.proxy_id.as_deref(), Some(DEFAULT_PROXY_ID));

        let built = factory.built.lock().unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].username, "default-user");
        assert_eq!(built[0].password, "default-pass");
        assert_eq!(built[0].host, "default.proxy");
    }

    #[test]
    fn test_resolution_follows_current_default_credentials() {
        let (registry, factory) = registry();
        registry
            .update(
                DEFAULT_PROXY_ID,
                ProxyUpdate {
                    password: Some("rotated".to_string()),
                    ..ProxyUpdate::default()
                },
            )
            .unwrap();

        registry.resolve_transport("nobody");
        assert_eq!(factory.built.lock().unwrap()[0].password, "rotated");
    }

    #[test]
    fn test_assigned_user_resolves_to_assigned_proxy() {
        let (registry, factory) = registry();
        let eu = registry.create(spec("eu"), "alice").unwrap();
        registry.assign("bob", &eu.id).unwrap();

        let resolved = registry.resolve_transport("bob");
        assert_eq!(resolved.proxy_id.as_deref(), Some(eu.id.as_str()));
        assert_eq!(factory.built.lock().unwrap()[0].username, "eu-user");
    }

    #[test]
    fn test_inactive_assignment_falls_back_to_default() {
        let (registry, _) = registry();
        let eu = registry.create(spec("eu"), "alice").unwrap();
        registry.assign("bob", &eu.id).unwrap();
        registry
            .update(
                &eu.id,
                ProxyUpdate {
                    active: Some(false),
                    ..ProxyUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(registry.resolve_entry("bob").id, DEFAULT_PROXY_ID);
    }

    #[test]
    fn test_build_failure_falls_back_to_direct() {
        let factory = Arc::new(RecordingFactory {
            fail: true,
            ..RecordingFactory::default()
        });
        let registry =
            ProxyRegistry::with_factory(default_spec(), factory.clone(), Duration::from_secs(30));

        let resolved = registry.resolve_transport("bob");
        assert!(resolved.is_direct());
        assert_eq!(factory.built.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_without_host_is_direct() {
        let factory = Arc::new(RecordingFactory::default());
        let registry = ProxyRegistry::with_factory(
            ProxySpec {
                name: "default".to_string(),
                ..ProxySpec::default()
            },
            factory.clone(),
            Duration::from_secs(30),
        );

        assert!(registry.resolve_transport("bob").is_direct());
        assert!(factory.built.lock().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_mutations_keep_registry_consistent() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for i in 0..20 {
                        let view =
                            registry.create(spec(&format!("w{}-{}", worker, i)), "t").unwrap();
                        let user = format!("user-{}-{}", worker, i);
                        registry.assign(&user, &view.id).unwrap();
                        if i % 2 == 0 {
                            registry.delete(&view.id).unwrap();
                        }
                        registry.resolve_entry(&user);
                    }
                });
            }
        });

        // 1 default + 8 workers * 10 surviving proxies
        assert_eq!(registry.list().len(), 81);
        let assignments = registry.assignments();
        assert_eq!(assignments.len(), 80);
        for proxy_id in assignments.values() {
            assert!(registry.get(proxy_id).is_ok());
        }
    }
}
