//! Registry behaviour against fixture services. No network.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use atuyka_paginator::{params, MergedPaginator, Paginator};
use atuyka_services::{
    AtuykaConfig, AtuykaError, Connection, Page, PageParams, Paged, Plugin, Post, Resource,
    Result, ServiceClient, ServiceConfig, ServiceDeclaration, ServiceRegistry, User,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
}

fn post(service: &str, id: &str, minute: i64) -> Post {
    Post {
        service: service.to_string(),
        created_at: at(minute),
        id: id.to_string(),
        url: format!("https://{service}.test/p/{id}"),
        alt_url: None,
        title: None,
        description: None,
        views: None,
        likes: None,
        comments: None,
        attachments: vec![],
        tags: vec![],
        author: None,
        connections: vec![],
        mentions: vec![],
        nsfw: None,
        language: None,
        liked: None,
    }
}

fn user(service: &str, id: &str) -> User {
    User {
        service: service.to_string(),
        created_at: None,
        id: id.to_string(),
        name: id.to_string(),
        unique_name: None,
        bio: None,
        url: format!("https://{service}.test/u/{id}"),
        alt_url: None,
        avatar: None,
        banner: None,
        followers: None,
        connections: vec![],
        mentions: vec![],
        tags: vec![],
        language: None,
        following: None,
    }
}

/// Serves `posts` two at a time, linked through an `offset` param.
fn page_of(posts: Vec<Post>, params: &PageParams) -> Page<Post> {
    let offset = params.get("offset").and_then(|v| v.as_int()).unwrap_or(0) as usize;
    let items: Vec<Post> = posts.into_iter().skip(offset).take(2).collect();
    let next = offset + 2;
    if items.len() == 2 {
        Page::with_next(items, atuyka_paginator::params([("offset", next as i64)]))
    } else {
        Page::last(items)
    }
}

// =========================================================================
// Fixture services
// =========================================================================

/// Public service with posts at even minutes.
struct Open;

#[async_trait]
impl ServiceClient for Open {
    fn slug(&self) -> &str {
        "open"
    }

    async fn get_user(&self, user: Option<&str>) -> Result<User> {
        let user = user.ok_or(AtuykaError::MissingUserId {
            service: "open".into(),
        })?;
        Ok(self::user("open", user))
    }

    async fn get_posts(&self, _user: Option<&str>, params: PageParams) -> Result<Page<Post>> {
        let posts = (0..5).map(|i| post("open", &format!("o{i}"), i * 2)).collect();
        Ok(page_of(posts, &params))
    }
}

impl ServiceDeclaration for Open {
    fn config() -> ServiceConfig {
        ServiceConfig::new("open").url("https://open.test")
    }

    fn connect(_token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        Ok(Open)
    }

    fn parse_connection_url(url: &str) -> Option<Connection> {
        let user = url.strip_prefix("https://open.test/u/")?;
        Some(Connection::user("open", url, user))
    }
}

/// Public service with posts at odd minutes, reached through a proxy.
struct Mirror;

#[async_trait]
impl ServiceClient for Mirror {
    fn slug(&self) -> &str {
        "mirror"
    }

    async fn get_posts(&self, _user: Option<&str>, params: PageParams) -> Result<Page<Post>> {
        let posts = (0..3).map(|i| post("mirror", &format!("m{i}"), i * 2 + 1)).collect();
        Ok(page_of(posts, &params))
    }
}

impl ServiceDeclaration for Mirror {
    fn config() -> ServiceConfig {
        ServiceConfig::new("mirror").name("Open").proxy("open")
    }

    fn connect(_token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        Ok(Mirror)
    }
}

static LOCKED_CONNECTS: AtomicUsize = AtomicUsize::new(0);

/// Service requiring a token. Counts constructions.
struct Locked {
    token: String,
}

#[async_trait]
impl ServiceClient for Locked {
    fn slug(&self) -> &str {
        "locked"
    }

    fn my_user_id(&self) -> Option<String> {
        Some(format!("owner-of-{}", self.token))
    }
}

impl ServiceDeclaration for Locked {
    fn config() -> ServiceConfig {
        ServiceConfig::new("locked").auth(true)
    }

    fn connect(token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        LOCKED_CONNECTS.fetch_add(1, Ordering::SeqCst);
        Ok(Locked {
            token: token.unwrap_or_default(),
        })
    }
}

/// Claims the slug of `Open`.
struct Impostor;

#[async_trait]
impl ServiceClient for Impostor {
    fn slug(&self) -> &str {
        "open"
    }
}

impl ServiceDeclaration for Impostor {
    fn config() -> ServiceConfig {
        ServiceConfig::new("open")
    }

    fn connect(_token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        Ok(Impostor)
    }
}

/// Declaration that never validates.
struct Broken;

#[async_trait]
impl ServiceClient for Broken {
    fn slug(&self) -> &str {
        "Broken Service"
    }
}

impl ServiceDeclaration for Broken {
    fn config() -> ServiceConfig {
        ServiceConfig::new("Broken Service")
    }

    fn connect(_token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        Ok(Broken)
    }
}

static FLAKY_CLOSES: AtomicUsize = AtomicUsize::new(0);

/// Rejects every session on start. Counts closes.
struct Flaky;

#[async_trait]
impl ServiceClient for Flaky {
    fn slug(&self) -> &str {
        "flaky"
    }

    async fn start(&self) -> Result<()> {
        Err(AtuykaError::InvalidToken {
            service: "flaky".into(),
        })
    }

    async fn close(&self) -> Result<()> {
        FLAKY_CLOSES.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ServiceDeclaration for Flaky {
    fn config() -> ServiceConfig {
        ServiceConfig::new("flaky")
    }

    fn connect(_token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        Ok(Flaky)
    }

    fn parse_connection_url(url: &str) -> Option<Connection> {
        let user = url.strip_prefix("https://flaky.test/u/")?;
        Some(Connection::user("flaky", url, user))
    }
}

/// Serves users but fails to close.
struct Leaky;

#[async_trait]
impl ServiceClient for Leaky {
    fn slug(&self) -> &str {
        "leaky"
    }

    async fn get_user(&self, user: Option<&str>) -> Result<User> {
        Ok(self::user("leaky", user.unwrap_or("anonymous")))
    }

    async fn close(&self) -> Result<()> {
        Err(AtuykaError::Network("connection reset".into()))
    }
}

impl ServiceDeclaration for Leaky {
    fn config() -> ServiceConfig {
        ServiceConfig::new("leaky")
    }

    fn connect(_token: Option<String>, _config: &AtuykaConfig) -> Result<Self> {
        Ok(Leaky)
    }

    fn parse_connection_url(url: &str) -> Option<Connection> {
        let user = url.strip_prefix("https://leaky.test/u/")?;
        Some(Connection::user("leaky", url, user))
    }
}

fn fixture_plugins() -> Vec<Plugin> {
    vec![
        Plugin::of::<Broken>("broken"),
        Plugin::of::<Locked>("locked"),
        Plugin::of::<Mirror>("mirror"),
        Plugin::of::<Open>("open"),
    ]
}

fn registry() -> ServiceRegistry {
    ServiceRegistry::with_plugins(AtuykaConfig::default(), fixture_plugins())
}

// =========================================================================
// Discovery
// =========================================================================

#[test]
fn broken_plugin_is_skipped_during_discovery() {
    let registry = registry();
    let loaded = registry.discover(&[], &[]);

    assert_eq!(loaded, vec!["locked", "mirror", "open"]);
    let services = registry.available_services().unwrap();
    assert_eq!(services.keys().collect::<Vec<_>>(), vec!["locked", "mirror", "open"]);
}

#[test]
fn lookup_discovers_lazily() {
    let registry = registry();
    let infos = registry.service_infos().unwrap();

    let slugs: Vec<_> = infos.iter().map(|info| info.slug.as_str()).collect();
    assert_eq!(slugs, vec!["locked", "mirror", "open"]);

    let mirror = infos.iter().find(|info| info.slug == "mirror").unwrap();
    assert_eq!(mirror.name, "Open (open)");
    assert!(infos.iter().find(|info| info.slug == "locked").unwrap().authorization);
}

#[test]
fn include_and_exclude_filter_plugins() {
    let registry = registry();
    let include = vec!["open".to_string(), "locked".to_string()];
    let exclude = vec!["locked".to_string()];

    assert_eq!(registry.discover(&include, &exclude), vec!["open"]);
}

#[test]
fn config_filters_apply_to_lazy_discovery() {
    let mut config = AtuykaConfig::default();
    config.services.exclude = vec!["open".into(), "mirror".into()];
    let registry = ServiceRegistry::with_plugins(config, fixture_plugins());

    let services = registry.available_services().unwrap();
    assert_eq!(services.keys().collect::<Vec<_>>(), vec!["locked"]);
}

#[test]
fn empty_registry_reports_no_services() {
    let registry = ServiceRegistry::with_plugins(AtuykaConfig::default(), vec![Plugin::of::<Broken>("broken")]);

    let err = registry.available_services().unwrap_err();
    assert!(matches!(err, AtuykaError::NoServicesLoaded));
    assert_eq!(err.code(), "NoServices");
}

#[test]
fn same_type_registers_once_and_other_types_are_rejected() {
    let registry = registry();
    registry.register::<Open>().unwrap();
    registry.register::<Open>().unwrap();

    let err = registry.register::<Impostor>().unwrap_err();
    assert!(matches!(err, AtuykaError::DuplicateService { ref service } if service == "open"));
    assert_eq!(registry.available_services().unwrap().len(), 1);
}

#[test]
fn global_registry_ships_bluesky() {
    let infos = ServiceRegistry::global().service_infos().unwrap();
    let bluesky = infos.iter().find(|info| info.slug == "bluesky").unwrap();

    assert_eq!(bluesky.name, "Bluesky");
    assert!(!bluesky.authorization);
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn unknown_slug_lists_registered_services() {
    let err = registry().create("myspace", None).err().unwrap();

    match err {
        AtuykaError::UnknownService { service, available } => {
            assert_eq!(service, "myspace");
            assert_eq!(available, vec!["locked", "mirror", "open"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_credential_fails_before_connecting() {
    let registry = registry();

    let err = registry.create("locked", None).err().unwrap();
    assert!(matches!(err, AtuykaError::MissingCredential { ref service } if service == "locked"));
    assert_eq!(err.status(), 401);
    assert_eq!(LOCKED_CONNECTS.load(Ordering::SeqCst), 0);

    let client = registry.create("locked", Some("abc".into())).unwrap();
    assert_eq!(client.my_user_id().as_deref(), Some("owner-of-abc"));
    assert_eq!(LOCKED_CONNECTS.load(Ordering::SeqCst), 1);
}

#[test]
fn schemas_cover_every_base_operation() {
    let schemas = registry().schemas("open").unwrap();
    let names: Vec<_> = schemas.iter().map(|schema| schema["name"].as_str().unwrap()).collect();

    assert_eq!(names.len(), 12);
    assert!(names.contains(&"liked_posts"));
    assert!(names.contains(&"search_users"));

    let user = schemas.iter().find(|schema| schema["name"] == "user").unwrap();
    assert_eq!(user["description"], "Get user.");
    assert_eq!(user["parameters"][0]["name"], "service");
    assert_eq!(user["parameters"][0]["required"], true);
    assert_eq!(user["parameters"][1]["name"], "token");
}

// =========================================================================
// Pagination through clients
// =========================================================================

#[tokio::test]
async fn paged_operation_follows_next_params() {
    let client = registry().create("open", None).unwrap();
    let posts = Paged::new(client).posts(Some("alice")).await.unwrap();

    let ids: Vec<_> = posts.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids, vec!["o0", "o1", "o2", "o3", "o4"]);
}

#[tokio::test]
async fn unsupported_operation_is_explicit() {
    let client = registry().create("mirror", None).unwrap();
    let mut users = Paged::new(client).followers(Some("alice"));

    let err = users.next().await.unwrap_err();
    assert!(matches!(
        err,
        AtuykaError::UnsupportedOperation { ref service, ref operation }
            if service == "mirror" && operation == "get_followers"
    ));
    assert!(users.is_exhausted());
}

#[tokio::test]
async fn posts_merge_across_services_by_time() {
    let registry = registry();
    let open = Paged::new(registry.create("open", None).unwrap()).posts(Some("alice"));
    let mirror = Paged::new(registry.create("mirror", None).unwrap()).posts(Some("alice"));

    let merged = MergedPaginator::new(vec![open, mirror], |post: &Post| post.created_at);
    let ids: Vec<_> = merged
        .await
        .unwrap()
        .into_iter()
        .map(|post| post.id)
        .collect();

    assert_eq!(ids, vec!["o0", "m0", "o1", "m1", "o2", "m2", "o3", "o4"]);
}

#[tokio::test]
async fn explicit_params_fetch_a_later_page() {
    let client = registry().create("open", None).unwrap();

    let page = client.get_posts(None, params([("offset", 2i64)])).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids, vec!["o2", "o3"]);
    assert!(!page.is_last());
}

#[tokio::test]
async fn limited_merge_stops_early() {
    let registry = registry();
    let open = Paged::new(registry.create("open", None).unwrap()).posts(None);
    let mirror = Paged::new(registry.create("mirror", None).unwrap()).posts(None);

    let merged = MergedPaginator::new(vec![open, mirror], |post: &Post| post.created_at).with_limit(3);
    let ids: Vec<_> = merged.flatten().await.unwrap().into_iter().map(|p| p.id).collect();

    assert_eq!(ids, vec!["o0", "m0", "o1"]);
}

// =========================================================================
// Connection URLs
// =========================================================================

#[tokio::test]
async fn resource_is_fetched_from_connection_url() {
    let registry = registry();

    let connection = registry.parse_connection_url("https://open.test/u/alice").unwrap();
    assert_eq!(connection.service.as_deref(), Some("open"));

    let resource = registry.get_resource("https://open.test/u/alice").await.unwrap();
    match resource {
        Some(Resource::User(user)) => assert_eq!(user.id, "alice"),
        other => panic!("unexpected resource: {other:?}"),
    }

    assert!(registry.get_resource("https://elsewhere.test/x").await.unwrap().is_none());
}

#[tokio::test]
async fn client_is_closed_when_start_fails() {
    let registry = ServiceRegistry::with_plugins(AtuykaConfig::default(), vec![Plugin::of::<Flaky>("flaky")]);

    let err = registry.get_resource("https://flaky.test/u/alice").await.unwrap_err();
    assert_eq!(err.code(), "InvalidToken");
    assert_eq!(FLAKY_CLOSES.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_close_keeps_fetched_resource() {
    let registry = ServiceRegistry::with_plugins(AtuykaConfig::default(), vec![Plugin::of::<Leaky>("leaky")]);

    let resource = registry.get_resource("https://leaky.test/u/bob").await.unwrap();
    match resource {
        Some(Resource::User(user)) => assert_eq!(user.id, "bob"),
        other => panic!("unexpected resource: {other:?}"),
    }
}
