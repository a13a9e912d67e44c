// The contract every service plugin implements, plus the static declaration
// the registry reads to list, describe and construct it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use atuyka_paginator::{paginate, UniversalPaginator};

use crate::config::AtuykaConfig;
use crate::endpoint::MethodSignature;
use crate::error::{AtuykaError, Result};
use crate::models::{Comment, Connection, Page, PageParams, Post, ServiceInfo, User};

/// A connected client for one upstream service.
///
/// Page-returning operations take the keyword parameters of the request as
/// `PageParams`. The first page is requested with whatever the caller passed;
/// every following page with the `next` params of the previous one.
///
/// Every operation defaults to `UnsupportedOperation`, so a plugin only
/// implements what its upstream can answer.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Slug this client was registered under.
    fn slug(&self) -> &str;

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Logged-in user's ID, once known.
    fn my_user_id(&self) -> Option<String> {
        None
    }

    async fn get_user(&self, _user: Option<&str>) -> Result<User> {
        Err(AtuykaError::unsupported(self.slug(), "get_user"))
    }

    async fn get_liked_posts(&self, _user: Option<&str>, _params: PageParams) -> Result<Page<Post>> {
        Err(AtuykaError::unsupported(self.slug(), "get_liked_posts"))
    }

    async fn get_following(&self, _user: Option<&str>, _params: PageParams) -> Result<Page<User>> {
        Err(AtuykaError::unsupported(self.slug(), "get_following"))
    }

    async fn get_followers(&self, _user: Option<&str>, _params: PageParams) -> Result<Page<User>> {
        Err(AtuykaError::unsupported(self.slug(), "get_followers"))
    }

    async fn get_posts(&self, _user: Option<&str>, _params: PageParams) -> Result<Page<Post>> {
        Err(AtuykaError::unsupported(self.slug(), "get_posts"))
    }

    async fn get_post(&self, _user: Option<&str>, _post: &str) -> Result<Post> {
        Err(AtuykaError::unsupported(self.slug(), "get_post"))
    }

    /// Comments on a post, or replies to `comment` when given.
    async fn get_comments(
        &self,
        _user: Option<&str>,
        _post: &str,
        _comment: Option<&str>,
        _params: PageParams,
    ) -> Result<Page<Comment>> {
        Err(AtuykaError::unsupported(self.slug(), "get_comments"))
    }

    async fn get_similar_posts(
        &self,
        _user: Option<&str>,
        _post: &str,
        _params: PageParams,
    ) -> Result<Page<Post>> {
        Err(AtuykaError::unsupported(self.slug(), "get_similar_posts"))
    }

    async fn get_following_feed(&self, _params: PageParams) -> Result<Page<Post>> {
        Err(AtuykaError::unsupported(self.slug(), "get_following_feed"))
    }

    async fn get_recommended_feed(&self, _params: PageParams) -> Result<Page<Post>> {
        Err(AtuykaError::unsupported(self.slug(), "get_recommended_feed"))
    }

    async fn search_posts(&self, _query: Option<&str>, _params: PageParams) -> Result<Page<Post>> {
        Err(AtuykaError::unsupported(self.slug(), "search_posts"))
    }

    async fn search_users(&self, _query: Option<&str>, _params: PageParams) -> Result<Page<User>> {
        Err(AtuykaError::unsupported(self.slug(), "search_users"))
    }
}

/// Registration record of a service type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub slug: String,
    pub name: String,
    pub url: Option<String>,
    /// Alternative frontend URL.
    pub alt_url: Option<String>,
    pub requires_authorization: bool,
    /// Slug of the service whose API this one goes through.
    pub proxy_service: Option<String>,
}

impl ServiceConfig {
    /// A config whose display name is derived from the slug (`my_service` → `My Service`).
    pub fn new(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            name: title_case(&slug),
            slug,
            url: None,
            alt_url: None,
            requires_authorization: false,
            proxy_service: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn alt_url(mut self, alt_url: impl Into<String>) -> Self {
        self.alt_url = Some(alt_url.into());
        self
    }

    pub fn auth(mut self, requires_authorization: bool) -> Self {
        self.requires_authorization = requires_authorization;
        self
    }

    pub fn proxy(mut self, proxy_service: impl Into<String>) -> Self {
        self.proxy_service = Some(proxy_service.into());
        self
    }

    pub fn detailed_name(&self) -> String {
        match &self.proxy_service {
            Some(proxy) => format!("{} ({proxy})", self.name),
            None => self.name.clone(),
        }
    }

    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            slug: self.slug.clone(),
            name: self.detailed_name(),
            url: self.url.clone(),
            alt_url: self.alt_url.clone(),
            authorization: self.requires_authorization,
            proxy: self.proxy_service.clone(),
        }
    }
}

fn title_case(slug: &str) -> String {
    slug.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Static side of a service plugin.
pub trait ServiceDeclaration: ServiceClient + Sized + 'static {
    fn config() -> ServiceConfig;

    /// Signatures overriding the defaults of the base operations, usually to
    /// document the keyword parameters the service accepts.
    fn methods() -> Vec<MethodSignature> {
        Vec::new()
    }

    /// Build a client. No network activity happens here; credentials are
    /// validated by the service itself on first use.
    fn connect(token: Option<String>, config: &AtuykaConfig) -> Result<Self>;

    /// Recognise a URL that points at this service.
    fn parse_connection_url(_url: &str) -> Option<Connection> {
        None
    }
}

/// Lazy paginators over the page-returning operations of a client.
#[derive(Clone)]
pub struct Paged {
    client: Arc<dyn ServiceClient>,
}

impl Paged {
    pub fn new(client: Arc<dyn ServiceClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn ServiceClient> {
        &self.client
    }

    fn pages<T, F, Fut>(&self, endpoint: F) -> UniversalPaginator<T, AtuykaError>
    where
        T: Send,
        F: Fn(Arc<dyn ServiceClient>, PageParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>>> + Send + 'static,
    {
        let client = self.client.clone();
        paginate(move |params| endpoint(client.clone(), params))
    }

    pub fn liked_posts(&self, user: Option<&str>) -> UniversalPaginator<Post, AtuykaError> {
        let user = user.map(str::to_owned);
        self.pages(move |client, params| {
            let user = user.clone();
            async move { client.get_liked_posts(user.as_deref(), params).await }
        })
    }

    pub fn following(&self, user: Option<&str>) -> UniversalPaginator<User, AtuykaError> {
        let user = user.map(str::to_owned);
        self.pages(move |client, params| {
            let user = user.clone();
            async move { client.get_following(user.as_deref(), params).await }
        })
    }

    pub fn followers(&self, user: Option<&str>) -> UniversalPaginator<User, AtuykaError> {
        let user = user.map(str::to_owned);
        self.pages(move |client, params| {
            let user = user.clone();
            async move { client.get_followers(user.as_deref(), params).await }
        })
    }

    pub fn posts(&self, user: Option<&str>) -> UniversalPaginator<Post, AtuykaError> {
        let user = user.map(str::to_owned);
        self.pages(move |client, params| {
            let user = user.clone();
            async move { client.get_posts(user.as_deref(), params).await }
        })
    }

    pub fn comments(
        &self,
        user: Option<&str>,
        post: &str,
        comment: Option<&str>,
    ) -> UniversalPaginator<Comment, AtuykaError> {
        let user = user.map(str::to_owned);
        let post = post.to_owned();
        let comment = comment.map(str::to_owned);
        self.pages(move |client, params| {
            let (user, post, comment) = (user.clone(), post.clone(), comment.clone());
            async move {
                client
                    .get_comments(user.as_deref(), &post, comment.as_deref(), params)
                    .await
            }
        })
    }

    pub fn similar_posts(&self, user: Option<&str>, post: &str) -> UniversalPaginator<Post, AtuykaError> {
        let user = user.map(str::to_owned);
        let post = post.to_owned();
        self.pages(move |client, params| {
            let (user, post) = (user.clone(), post.clone());
            async move { client.get_similar_posts(user.as_deref(), &post, params).await }
        })
    }

    pub fn following_feed(&self) -> UniversalPaginator<Post, AtuykaError> {
        self.pages(|client, params| async move { client.get_following_feed(params).await })
    }

    pub fn recommended_feed(&self) -> UniversalPaginator<Post, AtuykaError> {
        self.pages(|client, params| async move { client.get_recommended_feed(params).await })
    }

    pub fn search_posts(&self, query: Option<&str>) -> UniversalPaginator<Post, AtuykaError> {
        let query = query.map(str::to_owned);
        self.pages(move |client, params| {
            let query = query.clone();
            async move { client.search_posts(query.as_deref(), params).await }
        })
    }

    pub fn search_users(&self, query: Option<&str>) -> UniversalPaginator<User, AtuykaError> {
        let query = query.map(str::to_owned);
        self.pages(move |client, params| {
            let query = query.clone();
            async move { client.search_users(query.as_deref(), params).await }
        })
    }
}
