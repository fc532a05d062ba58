//! Blog post records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::record::{Entity, RecordId};

/// Kind of content a post holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    /// Regular blog post.
    Post,
    /// Standalone page.
    Page,
    /// Short story.
    Story,
    /// Part of a series.
    Series,
}

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Work in progress.
    Draft,
    /// Waiting for `publish_on`.
    Scheduled,
    /// Under editorial review.
    Review,
    /// Publicly visible.
    Published,
}

/// Error returned when a stored discriminator is not recognised.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl PostType {
    /// Returns the stored discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
            Self::Story => "story",
            Self::Series => "series",
        }
    }
}

impl FromStr for PostType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "page" => Ok(Self::Page),
            "story" => Ok(Self::Story),
            "series" => Ok(Self::Series),
            other => Err(UnknownVariant {
                kind: "post type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PostStatus {
    /// Returns the stored discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Review => "review",
            Self::Published => "published",
        }
    }
}

impl FromStr for PostStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "review" => Ok(Self::Review),
            "published" => Ok(Self::Published),
            other => Err(UnknownVariant {
                kind: "post status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Store-assigned identity.
    pub id: RecordId,
    /// Headline.
    pub title: String,
    /// Content kind.
    pub post_type: PostType,
    /// URL slug, unique across posts.
    pub slug: String,
    /// Publication status.
    pub status: PostStatus,
    /// Body text.
    pub content: Option<String>,
    /// Cover image.
    pub featured_image_url: Option<String>,
    /// Scheduled publication time.
    pub publish_on: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Creation payload for a [`Post`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Headline.
    pub title: String,
    /// Content kind.
    pub post_type: PostType,
    /// URL slug.
    pub slug: String,
    /// Publication status.
    pub status: PostStatus,
    /// Body text.
    pub content: Option<String>,
    /// Cover image.
    pub featured_image_url: Option<String>,
    /// Scheduled publication time.
    pub publish_on: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Draft post with the given title and slug and no content.
    #[must_use]
    pub fn draft(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            post_type: PostType::Post,
            slug: slug.into(),
            status: PostStatus::Draft,
            content: None,
            featured_image_url: None,
            publish_on: None,
        }
    }
}

impl Entity for Post {
    type Draft = NewPost;

    const TABLE: &'static str = "posts";

    fn create(id: RecordId, draft: NewPost) -> Self {
        Self {
            id,
            title: draft.title,
            post_type: draft.post_type,
            slug: draft.slug,
            status: draft.status,
            content: draft.content,
            featured_image_url: draft.featured_image_url,
            publish_on: draft.publish_on,
            created_at: Utc::now(),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminators_parse_back() {
        for status in [
            PostStatus::Draft,
            PostStatus::Scheduled,
            PostStatus::Review,
            PostStatus::Published,
        ] {
            assert_eq!(status.as_str().parse::<PostStatus>().ok(), Some(status));
        }
        assert_eq!("series".parse::<PostType>().ok(), Some(PostType::Series));
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let err = "archived".parse::<PostStatus>().err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("unknown post status: archived")
        );
    }

    #[test]
    fn draft_defaults() {
        let post = Post::create(RecordId::new(5), NewPost::draft("Hello", "hello"));
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.post_type, PostType::Post);
        assert_eq!(post.unique_key(), Some("hello"));
    }
}
