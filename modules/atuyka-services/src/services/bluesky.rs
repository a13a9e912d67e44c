// Bluesky service: profiles, feeds, threads and search via the AT Protocol.
// Reads go to the public AppView (no auth). Likes, the timeline and the
// session lookup need a token and go to the PDS entryway instead.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{ServiceClient, ServiceConfig, ServiceDeclaration};
use crate::config::AtuykaConfig;
use crate::endpoint::{MethodSignature, ParamSignature, ParamType};
use crate::error::{AtuykaError, Result};
use crate::models::{
    Attachment, AttachmentUrl, Comment, Connection, Mention, Page, PageParams, Post, Tag, User,
};

const SLUG: &str = "bluesky";
const WEB_URL: &str = "https://bsky.app";

const PAGE_PARAMS: &[ParamSignature] = &[
    ParamSignature::optional("limit", ParamType::Integer),
    ParamSignature::optional("cursor", ParamType::String),
];

const AUTHOR_FEED_PARAMS: &[ParamSignature] = &[
    ParamSignature::optional("limit", ParamType::Integer),
    ParamSignature::optional("cursor", ParamType::String),
    ParamSignature::optional("filter", ParamType::String),
];

const SEARCH_POSTS_PARAMS: &[ParamSignature] = &[
    ParamSignature::optional("limit", ParamType::Integer),
    ParamSignature::optional("cursor", ParamType::String),
    ParamSignature::optional("sort", ParamType::String),
];

const THREAD_PARAMS: &[ParamSignature] = &[ParamSignature::optional("depth", ParamType::Integer)];

pub struct Bluesky {
    http: reqwest::Client,
    base_url: String,
    auth_base_url: String,
    token: Option<String>,
    /// DID of the logged-in account, resolved by `start`.
    session: OnceLock<String>,
}

impl Bluesky {
    pub fn new(token: Option<String>, config: &AtuykaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.bluesky.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.bluesky.base_url.trim_end_matches('/').to_string(),
            auth_base_url: config.bluesky.auth_base_url.trim_end_matches('/').to_string(),
            token,
            session: OnceLock::new(),
        })
    }

    /// Public AppView request.
    async fn xrpc<T: DeserializeOwned>(&self, method: &str, query: &[(String, String)]) -> Result<T> {
        let request = self
            .http
            .get(format!("{}/xrpc/{method}", self.base_url))
            .query(query);
        self.send(method, request).await
    }

    /// Request on behalf of the logged-in account.
    async fn xrpc_authed<T: DeserializeOwned>(
        &self,
        method: &str,
        operation: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let Some(token) = self.token.as_deref() else {
            debug!(operation, "bluesky: operation needs a token");
            return Err(AtuykaError::MissingCredential {
                service: SLUG.to_string(),
            });
        };

        let request = self
            .http
            .get(format!("{}/xrpc/{method}", self.auth_base_url))
            .bearer_auth(token)
            .query(query);
        self.send(method, request).await
    }

    async fn send<T: DeserializeOwned>(&self, method: &str, request: reqwest::RequestBuilder) -> Result<T> {
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let reset = resp
                .headers()
                .get("ratelimit-reset")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok());
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(method, status.as_u16(), &body, reset));
        }

        Ok(resp.json().await?)
    }

    /// Handle or DID of `user`, falling back to the logged-in account.
    fn actor(&self, user: Option<&str>) -> Result<String> {
        user.map(str::to_owned)
            .or_else(|| self.my_user_id())
            .ok_or_else(|| AtuykaError::MissingUserId {
                service: SLUG.to_string(),
            })
    }

    fn post_uri(&self, user: Option<&str>, post: &str) -> Result<String> {
        if post.starts_with("at://") {
            return Ok(post.to_string());
        }
        if post.is_empty() || post.contains('/') {
            return Err(AtuykaError::InvalidId {
                service: SLUG.to_string(),
                id: post.to_string(),
                id_type: "Post".to_string(),
            });
        }
        Ok(format!("at://{}/app.bsky.feed.post/{post}", self.actor(user)?))
    }

    async fn thread(&self, uri: &str, params: &PageParams) -> Result<ThreadViewPost> {
        let mut query = vec![("uri".to_string(), uri.to_string())];
        query.extend(page_query(params));

        let resp: ThreadResponse = self.xrpc("app.bsky.feed.getPostThread", &query).await?;
        match resp.thread {
            ThreadNode::Post(thread) => Ok(*thread),
            ThreadNode::NotFound | ThreadNode::Blocked | ThreadNode::Unknown => {
                Err(AtuykaError::InvalidResource {
                    service: SLUG.to_string(),
                    resource: uri.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ServiceClient for Bluesky {
    fn slug(&self) -> &str {
        SLUG
    }

    async fn start(&self) -> Result<()> {
        if self.token.is_none() || self.session.get().is_some() {
            return Ok(());
        }

        let session: SessionResponse = self
            .xrpc_authed("com.atproto.server.getSession", "start", &[])
            .await?;
        info!(handle = %session.handle, "bluesky: session resolved");
        let _ = self.session.set(session.did);
        Ok(())
    }

    fn my_user_id(&self) -> Option<String> {
        self.session.get().cloned()
    }

    async fn get_user(&self, user: Option<&str>) -> Result<User> {
        let actor = self.actor(user)?;
        let profile: ProfileView = self
            .xrpc("app.bsky.actor.getProfile", &[("actor".to_string(), actor)])
            .await?;
        Ok(profile.into_user())
    }

    async fn get_liked_posts(&self, user: Option<&str>, params: PageParams) -> Result<Page<Post>> {
        let mut query = vec![("actor".to_string(), self.actor(user)?)];
        query.extend(page_query(&params));

        let resp: FeedResponse = self
            .xrpc_authed("app.bsky.feed.getActorLikes", "get_liked_posts", &query)
            .await?;
        Ok(resp.into_page(&params))
    }

    async fn get_following(&self, user: Option<&str>, params: PageParams) -> Result<Page<User>> {
        let mut query = vec![("actor".to_string(), self.actor(user)?)];
        query.extend(page_query(&params));

        let resp: FollowsResponse = self.xrpc("app.bsky.graph.getFollows", &query).await?;
        Ok(users_page(resp.follows, resp.cursor, &params))
    }

    async fn get_followers(&self, user: Option<&str>, params: PageParams) -> Result<Page<User>> {
        let mut query = vec![("actor".to_string(), self.actor(user)?)];
        query.extend(page_query(&params));

        let resp: FollowersResponse = self.xrpc("app.bsky.graph.getFollowers", &query).await?;
        Ok(users_page(resp.followers, resp.cursor, &params))
    }

    async fn get_posts(&self, user: Option<&str>, params: PageParams) -> Result<Page<Post>> {
        let mut query = vec![("actor".to_string(), self.actor(user)?)];
        query.extend(page_query(&params));

        let resp: FeedResponse = self.xrpc("app.bsky.feed.getAuthorFeed", &query).await?;
        Ok(resp.into_page(&params))
    }

    async fn get_post(&self, user: Option<&str>, post: &str) -> Result<Post> {
        let uri = self.post_uri(user, post)?;
        let resp: PostsResponse = self
            .xrpc("app.bsky.feed.getPosts", &[("uris".to_string(), uri.clone())])
            .await?;

        resp.posts
            .into_iter()
            .next()
            .map(PostView::into_post)
            .ok_or(AtuykaError::InvalidResource {
                service: SLUG.to_string(),
                resource: uri,
            })
    }

    /// Direct replies to the post, or to `comment` (an `at://` URI) when given.
    /// Threads are not paginated upstream, so this is always a single page.
    async fn get_comments(
        &self,
        user: Option<&str>,
        post: &str,
        comment: Option<&str>,
        params: PageParams,
    ) -> Result<Page<Comment>> {
        let uri = match comment {
            Some(comment) => comment.to_string(),
            None => self.post_uri(user, post)?,
        };

        let thread = self.thread(&uri, &params).await?;
        Ok(Page::last(thread.into_comments(comment)))
    }

    async fn get_following_feed(&self, params: PageParams) -> Result<Page<Post>> {
        let query = page_query(&params);
        let resp: FeedResponse = self
            .xrpc_authed("app.bsky.feed.getTimeline", "get_following_feed", &query)
            .await?;
        Ok(resp.into_page(&params))
    }

    async fn search_posts(&self, query: Option<&str>, params: PageParams) -> Result<Page<Post>> {
        let mut request = vec![("q".to_string(), query.unwrap_or_default().to_string())];
        request.extend(page_query(&params));

        let resp: SearchPostsResponse = self.xrpc("app.bsky.feed.searchPosts", &request).await?;
        let next = next_params(&params, resp.cursor);
        let mut page = Page::new(resp.posts.into_iter().map(PostView::into_post).collect(), next);
        page.total = resp.hits_total;
        Ok(page)
    }

    async fn search_users(&self, query: Option<&str>, params: PageParams) -> Result<Page<User>> {
        let mut request = vec![("q".to_string(), query.unwrap_or_default().to_string())];
        request.extend(page_query(&params));

        let resp: SearchActorsResponse = self.xrpc("app.bsky.actor.searchActors", &request).await?;
        Ok(users_page(resp.actors, resp.cursor, &params))
    }
}

impl ServiceDeclaration for Bluesky {
    fn config() -> ServiceConfig {
        ServiceConfig::new(SLUG).name("Bluesky").url(WEB_URL)
    }

    fn methods() -> Vec<MethodSignature> {
        vec![
            MethodSignature::new(
                "get_liked_posts",
                "Get liked posts.\n\nArgs:\n    limit (int): Posts per page, at most 100.\n    cursor (str): Cursor from the previous page.",
            )
            .with_params(PAGE_PARAMS),
            MethodSignature::new(
                "get_following",
                "Get following users.\n\nArgs:\n    limit (int): Users per page, at most 100.\n    cursor (str): Cursor from the previous page.",
            )
            .with_params(PAGE_PARAMS),
            MethodSignature::new(
                "get_followers",
                "Get followers.\n\nArgs:\n    limit (int): Users per page, at most 100.\n    cursor (str): Cursor from the previous page.",
            )
            .with_params(PAGE_PARAMS),
            MethodSignature::new(
                "get_posts",
                "Get posts made by a user.\n\nArgs:\n    limit (int): Posts per page, at most 100.\n    cursor (str): Cursor from the previous page.\n    filter (str): One of posts_with_replies, posts_no_replies,\n        posts_with_media or posts_and_author_threads.",
            )
            .with_params(AUTHOR_FEED_PARAMS),
            MethodSignature::new(
                "get_comments",
                "Get comments.\n\nArgs:\n    depth (int): How many levels of replies to load.",
            )
            .with_params(THREAD_PARAMS),
            MethodSignature::new(
                "get_following_feed",
                "Get posts made by followed users.\n\nArgs:\n    limit (int): Posts per page, at most 100.\n    cursor (str): Cursor from the previous page.",
            )
            .with_params(PAGE_PARAMS),
            MethodSignature::new(
                "search_posts",
                "Search posts.\n\nArgs:\n    limit (int): Posts per page, at most 100.\n    cursor (str): Cursor from the previous page.\n    sort (str): Either top or latest.",
            )
            .with_params(SEARCH_POSTS_PARAMS),
            MethodSignature::new(
                "search_users",
                "Search users.\n\nArgs:\n    limit (int): Users per page, at most 100.\n    cursor (str): Cursor from the previous page.",
            )
            .with_params(PAGE_PARAMS),
        ]
    }

    fn connect(token: Option<String>, config: &AtuykaConfig) -> Result<Self> {
        Bluesky::new(token, config)
    }

    /// `https://bsky.app/profile/<handle>` and `.../post/<rkey>`.
    fn parse_connection_url(url: &str) -> Option<Connection> {
        let parsed = url::Url::parse(url).ok()?;
        if !matches!(parsed.host_str()?, "bsky.app" | "www.bsky.app") {
            return None;
        }

        let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["profile", handle] => Some(Connection::user(SLUG, url, *handle)),
            ["profile", handle, "post", rkey] => {
                Some(Connection::post(SLUG, url, Some(handle.to_string()), *rkey))
            }
            _ => None,
        }
    }
}

fn api_error(method: &str, status: u16, body: &str, reset: Option<i64>) -> AtuykaError {
    let error: XrpcError = serde_json::from_str(body).unwrap_or_default();
    let kind = error.error.clone();
    let service = SLUG.to_string();

    match (status, kind.as_deref()) {
        (429, _) => AtuykaError::RateLimited { service, reset },
        (401, _) | (_, Some("ExpiredToken" | "InvalidToken" | "AuthenticationRequired")) => {
            AtuykaError::InvalidToken { service }
        }
        (
            _,
            Some(
                "AccountTakedown" | "AccountDeactivated" | "RepoTakendown" | "RepoSuspended"
                | "RepoDeactivated",
            ),
        ) => AtuykaError::SuspendedResource {
            service,
            resource: error.message.unwrap_or_else(|| method.to_string()),
        },
        (404, _) | (_, Some("NotFound" | "ProfileNotFound" | "ActorNotFound")) => {
            AtuykaError::InvalidResource {
                service,
                resource: error.message.unwrap_or_else(|| method.to_string()),
            }
        }
        (_, Some("BlockedActor" | "BlockedByActor")) => AtuykaError::PrivateResource {
            service,
            resource: error.message.unwrap_or_else(|| method.to_string()),
        },
        _ => AtuykaError::Api {
            service,
            status,
            message: error
                .message
                .or(error.error)
                .unwrap_or_else(|| body.to_string()),
        },
    }
}

/// Request params forwarded as query string.
fn page_query(params: &PageParams) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

/// Params for the following page: the current ones with the new cursor.
fn next_params(params: &PageParams, cursor: Option<String>) -> Option<PageParams> {
    let cursor = cursor.filter(|cursor| !cursor.is_empty())?;
    let mut next = params.clone();
    next.insert("cursor".to_string(), cursor.into());
    Some(next)
}

fn users_page(profiles: Vec<ProfileView>, cursor: Option<String>, params: &PageParams) -> Page<User> {
    Page::new(
        profiles.into_iter().map(ProfileView::into_user).collect(),
        next_params(params, cursor),
    )
}

fn profile_url(handle: &str) -> String {
    format!("{WEB_URL}/profile/{handle}")
}

/// Last segment of an `at://` URI.
fn rkey(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// CDN URLs carry their format after `@`, e.g. `.../bafkrei@jpeg`.
fn cdn_attachment_url(url: &str) -> AttachmentUrl {
    let attachment = AttachmentUrl::new(SLUG, url);
    match url.rsplit_once('@').map(|(_, format)| format) {
        Some(format @ ("jpeg" | "png" | "webp" | "gif")) => {
            attachment.with_content_type(format!("image/{format}"))
        }
        _ => attachment,
    }
}

// --- AT Protocol response types ---

#[derive(Deserialize, Default)]
struct XrpcError {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SessionResponse {
    did: String,
    handle: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    did: String,
    handle: String,
    display_name: Option<String>,
    description: Option<String>,
    avatar: Option<String>,
    banner: Option<String>,
    followers_count: Option<u64>,
    created_at: Option<String>,
    viewer: Option<ProfileViewer>,
}

#[derive(Deserialize)]
struct ProfileViewer {
    following: Option<String>,
}

impl ProfileView {
    fn into_user(self) -> User {
        let name = self
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.handle.clone());

        User {
            service: SLUG.to_string(),
            created_at: self.created_at.as_deref().and_then(parse_datetime),
            id: self.did,
            name,
            url: profile_url(&self.handle),
            unique_name: Some(self.handle),
            bio: self.description.filter(|bio| !bio.is_empty()),
            alt_url: None,
            avatar: self.avatar.as_deref().map(|url| Attachment::original(cdn_attachment_url(url))),
            banner: self.banner.as_deref().map(|url| Attachment::original(cdn_attachment_url(url))),
            followers: self.followers_count,
            connections: vec![],
            mentions: vec![],
            tags: vec![],
            language: None,
            following: self.viewer.map(|viewer| viewer.following.is_some()),
        }
    }
}

#[derive(Deserialize)]
struct FeedResponse {
    cursor: Option<String>,
    feed: Vec<FeedItem>,
}

impl FeedResponse {
    fn into_page(self, params: &PageParams) -> Page<Post> {
        Page::new(
            self.feed.into_iter().map(|item| item.post.into_post()).collect(),
            next_params(params, self.cursor),
        )
    }
}

#[derive(Deserialize)]
struct FeedItem {
    post: PostView,
}

#[derive(Deserialize)]
struct FollowsResponse {
    cursor: Option<String>,
    follows: Vec<ProfileView>,
}

#[derive(Deserialize)]
struct FollowersResponse {
    cursor: Option<String>,
    followers: Vec<ProfileView>,
}

#[derive(Deserialize)]
struct PostsResponse {
    posts: Vec<PostView>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPostsResponse {
    cursor: Option<String>,
    hits_total: Option<u64>,
    posts: Vec<PostView>,
}

#[derive(Deserialize)]
struct SearchActorsResponse {
    cursor: Option<String>,
    actors: Vec<ProfileView>,
}

#[derive(Deserialize)]
struct ThreadResponse {
    thread: ThreadNode,
}

#[derive(Deserialize)]
#[serde(tag = "$type")]
enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(Box<ThreadViewPost>),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound,
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
struct ThreadViewPost {
    post: PostView,
    #[serde(default)]
    replies: Vec<ThreadNode>,
}

impl ThreadViewPost {
    /// Direct replies as comments. `parent` is the comment they answer, if any.
    fn into_comments(self, parent: Option<&str>) -> Vec<Comment> {
        self.replies
            .into_iter()
            .filter_map(|reply| match reply {
                ThreadNode::Post(reply) => Some(reply.post.into_comment(parent)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostView {
    uri: String,
    author: ProfileView,
    record: PostRecord,
    embed: Option<Embed>,
    reply_count: Option<u64>,
    like_count: Option<u64>,
    indexed_at: DateTime<Utc>,
    viewer: Option<PostViewer>,
}

#[derive(Deserialize)]
struct PostViewer {
    like: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostRecord {
    #[serde(default)]
    text: String,
    created_at: Option<String>,
    #[serde(default)]
    langs: Vec<String>,
    #[serde(default)]
    facets: Vec<Facet>,
}

#[derive(Deserialize)]
struct Facet {
    features: Vec<FacetFeature>,
}

#[derive(Deserialize)]
#[serde(tag = "$type")]
enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(tag = "$type")]
enum Embed {
    #[serde(rename = "app.bsky.embed.images#view")]
    Images { images: Vec<ImageView> },
    #[serde(rename = "app.bsky.embed.video#view")]
    Video(VideoView),
    #[serde(rename = "app.bsky.embed.external#view")]
    External { external: ExternalView },
    #[serde(rename = "app.bsky.embed.recordWithMedia#view")]
    RecordWithMedia { media: Box<Embed> },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageView {
    thumb: String,
    fullsize: String,
    aspect_ratio: Option<AspectRatio>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoView {
    playlist: String,
    thumbnail: Option<String>,
    aspect_ratio: Option<AspectRatio>,
}

#[derive(Deserialize)]
struct ExternalView {
    uri: String,
}

#[derive(Deserialize, Clone, Copy)]
struct AspectRatio {
    width: u32,
    height: u32,
}

impl Embed {
    fn attachments(&self) -> Vec<Attachment> {
        match self {
            Embed::Images { images } => images
                .iter()
                .map(|image| {
                    let (width, height) = size(image.aspect_ratio);
                    let mut attachment =
                        Attachment::original(cdn_attachment_url(&image.fullsize).with_size(width, height));
                    attachment.thumbnail = Some(cdn_attachment_url(&image.thumb));
                    attachment
                })
                .collect(),
            Embed::Video(video) => {
                let (width, height) = size(video.aspect_ratio);
                let mut attachment = Attachment::original(
                    AttachmentUrl::new(SLUG, &video.playlist)
                        .with_size(width, height)
                        .with_content_type("application/vnd.apple.mpegurl"),
                );
                attachment.thumbnail = video.thumbnail.as_deref().map(cdn_attachment_url);
                vec![attachment]
            }
            Embed::RecordWithMedia { media } => media.attachments(),
            Embed::External { .. } | Embed::Unknown => vec![],
        }
    }

    fn link(&self) -> Option<Connection> {
        match self {
            Embed::External { external } => Some(Connection::link(&external.uri)),
            _ => None,
        }
    }
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn size(ratio: Option<AspectRatio>) -> (Option<u32>, Option<u32>) {
    match ratio {
        Some(ratio) => (Some(ratio.width), Some(ratio.height)),
        None => (None, None),
    }
}

impl PostView {
    fn created_at(&self) -> DateTime<Utc> {
        self.record
            .created_at
            .as_deref()
            .and_then(parse_datetime)
            .unwrap_or(self.indexed_at)
    }

    fn into_post(self) -> Post {
        let created_at = self.created_at();
        let id = rkey(&self.uri).to_string();
        let url = format!("{}/post/{id}", profile_url(&self.author.handle));

        let mut connections = Vec::new();
        let mut mentions = Vec::new();
        let mut tags = Vec::new();
        for feature in self.record.facets.into_iter().flat_map(|facet| facet.features) {
            match feature {
                FacetFeature::Mention { did } => mentions.push(Mention { url: profile_url(&did) }),
                FacetFeature::Link { uri } => connections.push(Connection::link(uri)),
                FacetFeature::Tag { tag } => tags.push(Tag::named(SLUG, tag)),
                FacetFeature::Unknown => {}
            }
        }

        let (attachments, link) = match &self.embed {
            Some(embed) => (embed.attachments(), embed.link()),
            None => (vec![], None),
        };
        if let Some(link) = link.filter(|link| !connections.contains(link)) {
            connections.push(link);
        }

        Post {
            service: SLUG.to_string(),
            created_at,
            id,
            url,
            alt_url: None,
            title: None,
            description: Some(self.record.text).filter(|text| !text.is_empty()),
            views: None,
            likes: self.like_count,
            comments: self.reply_count,
            attachments,
            tags,
            author: Some(self.author.into_user()),
            connections,
            mentions,
            nsfw: None,
            language: self.record.langs.into_iter().next(),
            liked: self.viewer.map(|viewer| viewer.like.is_some()),
        }
    }

    fn into_comment(self, parent: Option<&str>) -> Comment {
        let created_at = self.created_at();
        let attachments = self.embed.as_ref().map(Embed::attachments).unwrap_or_default();
        let url = format!("{}/post/{}", profile_url(&self.author.handle), rkey(&self.uri));

        Comment {
            service: SLUG.to_string(),
            created_at,
            id: self.uri,
            parent_id: parent.map(str::to_owned),
            url: Some(url),
            text: self.record.text,
            author: Some(self.author.into_user()),
            likes: self.like_count,
            replies: self.reply_count,
            attachments,
        }
    }
}
