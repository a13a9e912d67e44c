// Universal models shared by every service. Services convert their native
// payloads into these before returning them.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

pub use atuyka_paginator::{Page, PageParams, ParamValue};

/// Route prefix under which proxied resources are served.
const RESOURCES_ROUTE: &str = "/resources";

/// Everything but unreserved characters, so `/`, `+` and spaces are escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encode a URL so it fits in a single path segment.
pub fn quote_url(url: &str) -> String {
    utf8_percent_encode(url, PATH_SEGMENT).to_string()
}

/// Last path segment of a URL, without query or fragment.
pub fn filename(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Relative URL through which the resource is proxied.
pub fn routed_url(service: &str, url: &str) -> String {
    format!("{RESOURCES_ROUTE}/{service}/{}", quote_url(url))
}

/// Guess a content type from a file extension.
fn guess_content_type(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let content_type = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "m3u8" => "application/vnd.apple.mpegurl",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(content_type)
}

/// A service as listed to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_url: Option<String>,
    pub authorization: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

/// A pointer from one resource to a user or post, possibly on another service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

impl Connection {
    /// A plain outbound link not tied to a known service.
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            service: None,
            url: url.into(),
            user: None,
            post: None,
        }
    }

    pub fn user(service: &str, url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: Some(service.to_string()),
            url: url.into(),
            user: Some(user.into()),
            post: None,
        }
    }

    pub fn post(
        service: &str,
        url: impl Into<String>,
        user: Option<String>,
        post: impl Into<String>,
    ) -> Self {
        Self {
            service: Some(service.to_string()),
            url: url.into(),
            user,
            post: Some(post.into()),
        }
    }
}

/// A mention of some other resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub url: String,
}

/// One rendition of an attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentUrl {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Video duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Whether a video should loop like a GIF.
    #[serde(default)]
    pub r#loop: bool,
    pub url: String,
    pub routed_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_url: Option<String>,
}

impl AttachmentUrl {
    /// Build from the original URL, deriving filename, content type and routed URL.
    pub fn new(service: &str, url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = filename(&url);
        Self {
            service: service.to_string(),
            width: None,
            height: None,
            duration: None,
            content_type: guess_content_type(&filename).map(str::to_string),
            filename,
            r#loop: false,
            routed_url: routed_url(service, &url),
            url,
            alt_url: None,
        }
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<AttachmentUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small: Option<AttachmentUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<AttachmentUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<AttachmentUrl>,
    /// Extra metadata file (ugoira frames, alt text dumps).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AttachmentUrl>,
    pub original: AttachmentUrl,
}

impl Attachment {
    /// An attachment available only in its original rendition.
    pub fn original(original: AttachmentUrl) -> Self {
        Self {
            service: original.service.clone(),
            thumbnail: None,
            small: None,
            medium: None,
            large: None,
            metadata: None,
            original,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_count: Option<u64>,
}

impl Tag {
    pub fn named(service: &str, name: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            id: None,
            name: name.into(),
            localized_name: None,
            description: None,
            localized_description: None,
            post_count: None,
        }
    }
}

/// A user (post author, follower, commenter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Whether the authenticated user follows this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub service: String,
    pub created_at: DateTime<Utc>,
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Whether the authenticated user liked this post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub service: String,
    pub created_at: DateTime<Utc>,
    pub id: String,
    /// Comment this one replies to, if it is not top-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// What a connection URL resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Resource {
    User(User),
    Post(Post),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_url_fills_derived_fields() {
        let url = AttachmentUrl::new("bluesky", "https://cdn.bsky.app/img/feed_fullsize/plain/did:plc:abc/bafk@jpeg");
        assert_eq!(url.filename, "bafk@jpeg");
        assert_eq!(url.content_type, None);
        assert!(url.routed_url.starts_with("/resources/bluesky/https%3A%2F%2Fcdn.bsky.app"));

        let url = AttachmentUrl::new("pixiv", "https://i.pximg.net/img-original/123_p0.PNG?x=1");
        assert_eq!(url.filename, "123_p0.PNG");
        assert_eq!(url.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn routed_url_escapes_spaces_and_plus_signs() {
        assert_eq!(
            routed_url("pixiv", "https://i.example/a b+c.jpg"),
            "/resources/pixiv/https%3A%2F%2Fi.example%2Fa%20b%2Bc.jpg"
        );
        assert_eq!(quote_url("a-b_c.d~e"), "a-b_c.d~e");
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let user = User {
            service: "bluesky".into(),
            created_at: None,
            id: "did:plc:abc".into(),
            name: "Alice".into(),
            unique_name: Some("alice.bsky.social".into()),
            bio: None,
            url: "https://bsky.app/profile/alice.bsky.social".into(),
            alt_url: None,
            avatar: None,
            banner: None,
            followers: None,
            connections: vec![],
            mentions: vec![],
            tags: vec![],
            language: None,
            following: None,
        };

        let value = serde_json::to_value(&user).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("connections"));
        assert!(!object.contains_key("following"));
        assert_eq!(object["unique_name"], "alice.bsky.social");
    }
}
