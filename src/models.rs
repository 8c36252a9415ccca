use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::sanitize::escape_once;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The account record stored in the `public.profiles` table. This service only reads it:
/// the identity layer resolves it per request, and the `premium` flag gates the eyecatch feature.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // Entitlement flag unlocking `random_eyecatch`.
    pub premium: bool,
}

/// Blog
///
/// A post from the `public.blogs` table. `content` always holds the escaped form produced by
/// [`BlogParams::sanitize`], so views embed it as-is.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Blog {
    pub id: Uuid,
    // FK to public.profiles.id (Owner).
    pub user_id: Uuid,
    pub title: String,
    pub content: String,

    // Visible to the owner only.
    pub secret: bool,
    // Auto-generated cover image, premium accounts only.
    pub random_eyecatch: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    /// owned_by
    ///
    /// True only when a user is present and is the blog's owner. Anonymous requests never own anything.
    pub fn owned_by(&self, user: Option<Uuid>) -> bool {
        user.is_some_and(|id| id == self.user_id)
    }

    /// Merges the submitted (already sanitized) fields into this record. Absent fields keep their value.
    ///
    /// This includes `content`: an update that omits it keeps the stored body instead of writing an
    /// empty one.
    pub fn assign(&mut self, attrs: BlogAttributes) {
        if let Some(title) = attrs.title {
            self.title = title;
        }
        if let Some(content) = attrs.content {
            self.content = content;
        }
        if let Some(secret) = attrs.secret {
            self.secret = secret;
        }
        if let Some(random_eyecatch) = attrs.random_eyecatch {
            self.random_eyecatch = random_eyecatch;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_fields(&self.title, &self.content)
    }
}

/// BlogDraft
///
/// The unsaved state of a blog form: the template rendered by `new`, and the rejected record
/// re-rendered when `create` fails validation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    pub secret: bool,
    pub random_eyecatch: bool,
}

impl BlogDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_fields(&self.title, &self.content)
    }
}

impl From<BlogAttributes> for BlogDraft {
    fn from(attrs: BlogAttributes) -> Self {
        Self {
            title: attrs.title.unwrap_or_default(),
            content: attrs.content.unwrap_or_default(),
            secret: attrs.secret.unwrap_or(false),
            random_eyecatch: attrs.random_eyecatch.unwrap_or(false),
        }
    }
}

fn validate_fields(title: &str, content: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if title.trim().is_empty() {
        errors.add("title", "can't be blank");
    }
    if content.trim().is_empty() {
        errors.add("content", "can't be blank");
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// ValidationErrors
///
/// Field-level messages reported by the store when a record cannot be saved.
/// Serialized as `{ "title": ["can't be blank"] }`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn on(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

// --- Request Payloads (Input Schemas) ---

/// BlogEnvelope
///
/// Conventional form nesting: the permitted fields travel under the `blog` key.
/// Any sibling key is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BlogEnvelope {
    pub blog: BlogParams,
}

/// BlogParams
///
/// The parameter whitelist. Exactly these four fields are read from a submission; serde drops every
/// other key, so attributes like `user_id` or `id` can never reach the store.
///
/// `null` and an absent key are the same thing here. A present `random_eyecatch` (even `false`)
/// counts as a request for the premium feature.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BlogParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_eyecatch: Option<bool>,
}

impl BlogParams {
    /// sanitize
    ///
    /// Escapes `content` for HTML embedding. This is the only way to obtain [`BlogAttributes`],
    /// which is the only input the store accepts for writes.
    pub fn sanitize(self) -> BlogAttributes {
        BlogAttributes {
            title: self.title,
            content: self.content.as_deref().map(escape_once),
            secret: self.secret,
            random_eyecatch: self.random_eyecatch,
        }
    }
}

/// BlogAttributes
///
/// Whitelisted, sanitized fields ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogAttributes {
    title: Option<String>,
    content: Option<String>,
    secret: Option<bool>,
    random_eyecatch: Option<bool>,
}

impl BlogAttributes {
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}
