// Process-wide catalog of service types, keyed by slug.
//
// Plugins are registered explicitly: `discover` walks a static plugin list and
// calls each plugin's register function. Registration is permanent.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{ServiceClient, ServiceConfig, ServiceDeclaration};
use crate::config::{token_from_env, AtuykaConfig};
use crate::endpoint::{endpoint_metadata, ServiceMethod};
use crate::error::{AtuykaError, Result};
use crate::models::{Connection, Resource, ServiceInfo};
use crate::services::bluesky::Bluesky;

type ConnectFn = fn(Option<String>, &AtuykaConfig) -> Result<Arc<dyn ServiceClient>>;
type ParseUrlFn = fn(&str) -> Option<Connection>;

/// Everything the registry knows about one service type.
pub struct ServiceDescriptor {
    config: ServiceConfig,
    methods: BTreeMap<String, ServiceMethod>,
    type_id: TypeId,
    connect: ConnectFn,
    parse_connection_url: ParseUrlFn,
}

impl ServiceDescriptor {
    /// Validate the declaration of `S` and build its endpoint metadata.
    pub fn of<S: ServiceDeclaration>() -> Result<Self> {
        let config = S::config();
        validate_slug(&config.slug)?;
        if config.name.trim().is_empty() {
            return Err(AtuykaError::InvalidDeclaration(format!(
                "service {:?} has an empty name",
                config.slug
            )));
        }
        if config.proxy_service.as_deref() == Some(config.slug.as_str()) {
            return Err(AtuykaError::InvalidDeclaration(format!(
                "service {:?} cannot proxy itself",
                config.slug
            )));
        }

        Ok(Self {
            methods: endpoint_metadata(&S::methods())?,
            config,
            type_id: TypeId::of::<S>(),
            connect: connect_as::<S>,
            parse_connection_url: S::parse_connection_url,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn slug(&self) -> &str {
        &self.config.slug
    }

    pub fn methods(&self) -> &BTreeMap<String, ServiceMethod> {
        &self.methods
    }

    pub fn schemas(&self) -> Vec<Value> {
        self.methods.values().map(ServiceMethod::to_schema).collect()
    }

    pub fn info(&self) -> ServiceInfo {
        self.config.info()
    }

    pub fn parse_connection_url(&self, url: &str) -> Option<Connection> {
        (self.parse_connection_url)(url)
    }
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("config", &self.config)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn connect_as<S: ServiceDeclaration>(
    token: Option<String>,
    config: &AtuykaConfig,
) -> Result<Arc<dyn ServiceClient>> {
    Ok(Arc::new(S::connect(token, config)?))
}

fn validate_slug(slug: &str) -> Result<()> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(AtuykaError::InvalidDeclaration(format!(
            "invalid service slug {slug:?}"
        )))
    }
}

/// A loadable service plugin.
#[derive(Clone, Copy)]
pub struct Plugin {
    pub slug: &'static str,
    register: fn(&ServiceRegistry) -> Result<()>,
}

impl Plugin {
    pub const fn new(slug: &'static str, register: fn(&ServiceRegistry) -> Result<()>) -> Self {
        Self { slug, register }
    }

    /// Plugin registering the declared service type `S`.
    pub fn of<S: ServiceDeclaration>(slug: &'static str) -> Self {
        Self::new(slug, ServiceRegistry::register::<S>)
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin").field("slug", &self.slug).finish()
    }
}

/// Plugins shipped with this crate.
pub static KNOWN_SERVICES: &[Plugin] = &[Plugin::new("bluesky", ServiceRegistry::register::<Bluesky>)];

static GLOBAL: OnceLock<ServiceRegistry> = OnceLock::new();

pub struct ServiceRegistry {
    services: RwLock<BTreeMap<String, Arc<ServiceDescriptor>>>,
    plugins: Vec<Plugin>,
    config: AtuykaConfig,
}

impl ServiceRegistry {
    /// An empty registry that discovers the built-in plugins on demand.
    pub fn new(config: AtuykaConfig) -> Self {
        Self::with_plugins(config, KNOWN_SERVICES.iter().copied())
    }

    pub fn with_plugins(config: AtuykaConfig, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        Self {
            services: RwLock::new(BTreeMap::new()),
            plugins: plugins.into_iter().collect(),
            config,
        }
    }

    /// The process-wide registry. Uses default config unless [`init_global`]
    /// ran first.
    ///
    /// [`init_global`]: ServiceRegistry::init_global
    pub fn global() -> &'static ServiceRegistry {
        GLOBAL.get_or_init(|| ServiceRegistry::new(AtuykaConfig::default()))
    }

    /// Install the process-wide registry with `config`. Later calls keep the
    /// first registry.
    pub fn init_global(config: AtuykaConfig) -> &'static ServiceRegistry {
        let mut config = Some(config);
        let registry = GLOBAL.get_or_init(|| ServiceRegistry::new(config.take().unwrap_or_default()));
        if config.is_some() {
            warn!("Global service registry already initialized, ignoring new config");
        }
        registry
    }

    pub fn config(&self) -> &AtuykaConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<ServiceDescriptor>>> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<ServiceDescriptor>>> {
        self.services.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the service type `S`.
    ///
    /// Registering the same type twice is a no-op. A different type claiming
    /// an existing slug is rejected.
    pub fn register<S: ServiceDeclaration>(&self) -> Result<()> {
        let descriptor = ServiceDescriptor::of::<S>()?;
        let slug = descriptor.slug().to_string();

        let mut services = self.write();
        if let Some(existing) = services.get(&slug) {
            if existing.type_id == descriptor.type_id {
                return Ok(());
            }
            return Err(AtuykaError::DuplicateService { service: slug });
        }

        debug!(service = %slug, methods = descriptor.methods.len(), "Registered service");
        services.insert(slug, Arc::new(descriptor));
        Ok(())
    }

    /// Register every known plugin that passes the filters. An empty
    /// `include` admits all plugins. A plugin that fails to register is
    /// skipped with a warning. Returns the slugs that were loaded.
    pub fn discover(&self, include: &[String], exclude: &[String]) -> Vec<&'static str> {
        let mut loaded = Vec::new();

        for plugin in &self.plugins {
            if !include.is_empty() && !include.iter().any(|slug| slug == plugin.slug) {
                continue;
            }
            if exclude.iter().any(|slug| slug == plugin.slug) {
                continue;
            }

            match (plugin.register)(self) {
                Ok(()) => loaded.push(plugin.slug),
                Err(e) => warn!(plugin = plugin.slug, error = %e, "Failed to load service plugin"),
            }
        }

        info!(loaded = ?loaded, "Discovered services");
        loaded
    }

    /// Every registered service, discovering plugins once if none are
    /// registered yet.
    pub fn available_services(&self) -> Result<BTreeMap<String, Arc<ServiceDescriptor>>> {
        let services = self.read().clone();
        if !services.is_empty() {
            return Ok(services);
        }

        self.discover(&self.config.services.include, &self.config.services.exclude);

        let services = self.read().clone();
        if services.is_empty() {
            return Err(AtuykaError::NoServicesLoaded);
        }
        Ok(services)
    }

    pub fn descriptor(&self, slug: &str) -> Result<Arc<ServiceDescriptor>> {
        let mut services = self.available_services()?;
        services.remove(slug).ok_or_else(|| AtuykaError::UnknownService {
            service: slug.to_string(),
            available: services.into_keys().collect(),
        })
    }

    /// Construct a client for `slug`.
    ///
    /// Fails before touching the service if it requires authorization and no
    /// token was given. The token itself is passed through unexamined.
    pub fn create(&self, slug: &str, token: Option<String>) -> Result<Arc<dyn ServiceClient>> {
        let descriptor = self.descriptor(slug)?;

        if descriptor.config.requires_authorization && token.is_none() {
            return Err(AtuykaError::MissingCredential {
                service: slug.to_string(),
            });
        }

        let client = (descriptor.connect)(token, &self.config)?;
        info!(service = slug, "Created service client");
        Ok(client)
    }

    /// Endpoint schemas of `slug`, in operation name order.
    pub fn schemas(&self, slug: &str) -> Result<Vec<Value>> {
        Ok(self.descriptor(slug)?.schemas())
    }

    pub fn service_infos(&self) -> Result<Vec<ServiceInfo>> {
        Ok(self
            .available_services()?
            .values()
            .map(|descriptor| descriptor.info())
            .collect())
    }

    /// Ask every registered service whether it recognises `url`.
    pub fn parse_connection_url(&self, url: &str) -> Option<Connection> {
        self.available_services()
            .ok()?
            .values()
            .find_map(|descriptor| descriptor.parse_connection_url(url))
    }

    /// Fetch the post or user a URL points at. The client is created with
    /// the service's token from the environment, if any.
    pub async fn get_resource(&self, url: &str) -> Result<Option<Resource>> {
        let Some(connection) = self.parse_connection_url(url) else {
            return Ok(None);
        };
        let Some(service) = connection.service.as_deref() else {
            return Ok(None);
        };

        let client = self.create(service, token_from_env(service))?;
        let resource = fetch_resource(client.as_ref(), &connection).await;

        // The fetch outcome wins over a failed close.
        if let Err(e) = client.close().await {
            warn!(service, error = %e, "Failed to close service client");
        }
        resource
    }
}

async fn fetch_resource(client: &dyn ServiceClient, connection: &Connection) -> Result<Option<Resource>> {
    client.start().await?;

    match (connection.post.as_deref(), connection.user.as_deref()) {
        (Some(post), user) => Ok(Some(Resource::Post(client.get_post(user, post).await?))),
        (None, Some(user)) => Ok(Some(Resource::User(client.get_user(Some(user)).await?))),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_charset_is_enforced() {
        assert!(validate_slug("bluesky").is_ok());
        assert!(validate_slug("pixiv_proxy-2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Bluesky").is_err());
        assert!(validate_slug("blue sky").is_err());
    }

    #[test]
    fn known_services_register_cleanly() {
        let registry = ServiceRegistry::new(AtuykaConfig::default());
        let loaded = registry.discover(&[], &[]);
        assert_eq!(loaded, vec!["bluesky"]);

        let services = registry.available_services().unwrap();
        let bluesky = &services["bluesky"];
        assert_eq!(bluesky.config().name, "Bluesky");
        assert_eq!(bluesky.methods().len(), crate::endpoint::BASE_METHODS.len());
    }
}
