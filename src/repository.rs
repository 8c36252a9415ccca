use crate::{
    error::{RepositoryError, SaveError},
    models::{Blog, BlogDraft, User},
    sanitize::escape_once,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// BlogQuery
///
/// A listing pipeline composed the way the controller reads it:
/// `BlogQuery::search(term).published().default_order()`.
///
/// Each store decides how to execute it; the predicates themselves are defined here so that every
/// store agrees on them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogQuery {
    term: Option<String>,
    published_only: bool,
    newest_first: bool,
}

impl BlogQuery {
    /// Full-text filter. An absent or blank term matches everything.
    pub fn search(term: Option<&str>) -> Self {
        Self {
            term: term
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            ..Self::default()
        }
    }

    /// Keeps only published blogs, i.e. those that are not secret.
    pub fn published(mut self) -> Self {
        self.published_only = true;
        self
    }

    /// Newest first; ties on `created_at` are broken by id so the order is stable.
    pub fn default_order(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// The predicate part of the query, for stores that filter in process.
    pub fn matches(&self, blog: &Blog) -> bool {
        if self.published_only && blog.secret {
            return false;
        }
        match &self.term {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                blog.title.to_lowercase().contains(&needle)
                    || blog
                        .content
                        .to_lowercase()
                        .contains(&escape_once(term).to_lowercase())
            }
        }
    }
}

/// Repository Trait
///
/// The persistence contract the controller relies on. Handlers only ever see
/// `Arc<dyn Repository>`, so the Postgres store and the in-memory store are interchangeable.
///
/// Writes validate the record first and report field errors through [`SaveError::Invalid`].
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Blog Retrieval ---
    async fn list_blogs(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepositoryError>;
    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError>;

    // --- Blog Writes ---
    async fn insert_blog(&self, owner: Uuid, draft: &BlogDraft) -> Result<Blog, SaveError>;
    async fn save_blog(&self, blog: &Blog) -> Result<Blog, SaveError>;
    /// Removes the row permanently. Removing nothing is an error, never a silent no-op.
    async fn destroy_blog(&self, id: Uuid) -> Result<(), RepositoryError>;

    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const BLOG_COLUMNS: &str =
    "id, user_id, title, content, secret, random_eyecatch, created_at, updated_at";

/// PostgresRepository
///
/// The production store, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// `%`, `_` and `\` are literal characters in a search term.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_blogs
    ///
    /// Builds the filter with QueryBuilder so every user-supplied value is a bound parameter.
    /// Content is stored escaped, so it is matched against the escaped term.
    async fn list_blogs(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepositoryError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM blogs WHERE TRUE", BLOG_COLUMNS));

        if query.published_only {
            builder.push(" AND secret = false");
        }

        if let Some(term) = query.term() {
            builder.push(" AND (title ILIKE ");
            builder.push_bind(like_pattern(term));
            builder.push(" OR content ILIKE ");
            builder.push_bind(like_pattern(&escape_once(term)));
            builder.push(")");
        }

        if query.newest_first {
            builder.push(" ORDER BY created_at DESC, id DESC");
        }

        let blogs = builder
            .build_query_as::<Blog>()
            .fetch_all(&self.pool)
            .await?;
        Ok(blogs)
    }

    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {} FROM blogs WHERE id = $1",
            BLOG_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blog)
    }

    /// insert_blog
    ///
    /// Creates a blog owned by `owner`. The id and timestamps are assigned here, never taken from input.
    async fn insert_blog(&self, owner: Uuid, draft: &BlogDraft) -> Result<Blog, SaveError> {
        draft.validate().map_err(SaveError::Invalid)?;

        let blog = sqlx::query_as::<_, Blog>(&format!(
            "INSERT INTO blogs (id, user_id, title, content, secret, random_eyecatch, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.secret)
        .bind(draft.random_eyecatch)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(blog)
    }

    /// save_blog
    ///
    /// Writes every mutable column of an already merged record. Ownership and creation time are
    /// not part of the statement.
    async fn save_blog(&self, blog: &Blog) -> Result<Blog, SaveError> {
        blog.validate().map_err(SaveError::Invalid)?;

        let saved = sqlx::query_as::<_, Blog>(&format!(
            "UPDATE blogs SET title = $2, content = $3, secret = $4, random_eyecatch = $5, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(blog.id)
        .bind(&blog.title)
        .bind(&blog.content)
        .bind(blog.secret)
        .bind(blog.random_eyecatch)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        saved.ok_or_else(|| SaveError::Store(RepositoryError::Vanished(blog.id)))
    }

    async fn destroy_blog(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Vanished(id));
        }
        Ok(())
    }

    /// get_user
    ///
    /// Identity lookup used by the extractors. Lookup failures are logged and read as "no such user".
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, email, premium FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }
}

/// InMemoryRepository
///
/// A process-local store with the same semantics as [`PostgresRepository`]. Used when no
/// `DATABASE_URL` is configured in local mode, and by the test suite.
#[derive(Default)]
pub struct InMemoryRepository {
    // Insertion order.
    blogs: RwLock<Vec<Blog>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Stores a blog exactly as given, bypassing validation. For fixtures.
    pub async fn seed_blog(&self, blog: Blog) {
        self.blogs.write().await.push(blog);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_blogs(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepositoryError> {
        let blogs = self.blogs.read().await;
        let mut found: Vec<Blog> = blogs
            .iter()
            .filter(|blog| query.matches(blog))
            .cloned()
            .collect();

        if query.newest_first {
            found.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });
        }
        Ok(found)
    }

    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let blogs = self.blogs.read().await;
        Ok(blogs.iter().find(|blog| blog.id == id).cloned())
    }

    async fn insert_blog(&self, owner: Uuid, draft: &BlogDraft) -> Result<Blog, SaveError> {
        draft.validate().map_err(SaveError::Invalid)?;

        let now = Utc::now();
        let blog = Blog {
            id: Uuid::new_v4(),
            user_id: owner,
            title: draft.title.clone(),
            content: draft.content.clone(),
            secret: draft.secret,
            random_eyecatch: draft.random_eyecatch,
            created_at: now,
            updated_at: now,
        };
        self.blogs.write().await.push(blog.clone());
        Ok(blog)
    }

    async fn save_blog(&self, blog: &Blog) -> Result<Blog, SaveError> {
        blog.validate().map_err(SaveError::Invalid)?;

        let mut blogs = self.blogs.write().await;
        let stored = blogs
            .iter_mut()
            .find(|stored| stored.id == blog.id)
            .ok_or(RepositoryError::Vanished(blog.id))?;

        stored.title = blog.title.clone();
        stored.content = blog.content.clone();
        stored.secret = blog.secret;
        stored.random_eyecatch = blog.random_eyecatch;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn destroy_blog(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut blogs = self.blogs.write().await;
        let before = blogs.len();
        blogs.retain(|blog| blog.id != id);

        if blogs.len() == before {
            return Err(RepositoryError::Vanished(id));
        }
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }
}
