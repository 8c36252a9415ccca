use crate::{
    AppState,
    auth::{AuthUser, CurrentUser},
    error::{AppError, SaveError},
    flash::{Flash, IncomingFlash},
    models::{Blog, BlogDraft, BlogEnvelope, ValidationErrors},
    outcome::{BLOGS_PATH, Outcome, Page, ROOT_PATH, blog_path},
    policy::{self, Access},
    repository::BlogQuery,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use uuid::Uuid;

pub const CREATED_NOTICE: &str = "Blog was successfully created.";
pub const UPDATED_NOTICE: &str = "Blog was successfully updated.";
pub const DESTROYED_NOTICE: &str = "Blog was successfully destroyed.";
pub const PREMIUM_ONLY_ERROR: &str = "Some features are available only to premium users.";

// --- Filter Structs ---

/// BlogFilter
///
/// Query parameters accepted by the listing (GET /blogs).
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct BlogFilter {
    /// Optional full-text search over title and content. Blank means no filter.
    pub term: Option<String>,
}

// --- Guards ---

/// set_blog
///
/// Loads the blog named in the path, or fails with the uniform `NotFound`.
async fn set_blog(state: &AppState, id: Uuid) -> Result<Blog, AppError> {
    state.repo.find_blog(id).await?.ok_or(AppError::NotFound)
}

/// Visibility and ownership denials are reported exactly like a missing record.
fn require(access: Access, blog: &Blog) -> Result<(), AppError> {
    match access {
        Access::Allowed => Ok(()),
        Access::Denied(reason) => {
            tracing::debug!(blog_id = %blog.id, ?reason, "access denied");
            Err(AppError::NotFound)
        }
    }
}

fn premium_required(user: &AuthUser) -> Outcome {
    tracing::info!(user_id = %user.id, "premium-only field submitted by a regular account");
    Outcome::redirect(ROOT_PATH, Flash::error(PREMIUM_ONLY_ERROR))
}

// --- Handlers ---

/// index
///
/// [Public Route] Lists published blogs, optionally filtered by `term`, newest first.
#[utoipa::path(
    get,
    path = "/blogs",
    params(BlogFilter),
    responses((status = 200, description = "Published blogs, newest first", body = [Blog]))
)]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<BlogFilter>,
    IncomingFlash(flash): IncomingFlash,
) -> Result<Outcome, AppError> {
    let query = BlogQuery::search(filter.term.as_deref())
        .published()
        .default_order();
    let blogs = state.repo.list_blogs(&query).await?;

    Ok(Outcome::render(Page::Index {
        blogs,
        term: query.term().map(str::to_string),
    })
    .with_flash(flash))
}

/// show
///
/// [Public Route] Shows one blog. A secret blog is only shown to its owner; everyone else gets the
/// same 404 as for a blog that does not exist.
#[utoipa::path(
    get,
    path = "/blogs/{id}",
    params(("id" = Uuid, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Found", body = Blog),
        (status = 404, description = "Not found, or secret")
    )
)]
pub async fn show(
    CurrentUser(viewer): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    IncomingFlash(flash): IncomingFlash,
) -> Result<Outcome, AppError> {
    let blog = set_blog(&state, id).await?;
    require(policy::visibility(&blog, viewer.as_ref()), &blog)?;

    Ok(Outcome::render(Page::Show { blog }).with_flash(flash))
}

/// new_blog
///
/// [Authenticated Route] An empty form. Nothing is persisted.
#[utoipa::path(
    get,
    path = "/blogs/new",
    responses((status = 200, description = "Empty form", body = BlogDraft))
)]
pub async fn new_blog(_user: AuthUser, IncomingFlash(flash): IncomingFlash) -> Outcome {
    Outcome::render(Page::New {
        blog: BlogDraft::default(),
        errors: ValidationErrors::default(),
    })
    .with_flash(flash)
}

/// edit
///
/// [Authenticated Route] The edit form of a blog the requester owns.
#[utoipa::path(
    get,
    path = "/blogs/{id}/edit",
    params(("id" = Uuid, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Form", body = Blog),
        (status = 404, description = "Not found, or not owner")
    )
)]
pub async fn edit(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    IncomingFlash(flash): IncomingFlash,
) -> Result<Outcome, AppError> {
    let blog = set_blog(&state, id).await?;
    require(policy::ownership(&blog, &user), &blog)?;

    Ok(Outcome::render(Page::Edit {
        blog,
        errors: ValidationErrors::default(),
    })
    .with_flash(flash))
}

/// create
///
/// [Authenticated Route] Creates a blog owned by the requester.
///
/// Submitting `random_eyecatch` without a premium account redirects to the root with an error
/// flash and creates nothing. `content` is escaped before it is stored.
#[utoipa::path(
    post,
    path = "/blogs",
    request_body = BlogEnvelope,
    responses(
        (status = 302, description = "Created, or premium feature refused"),
        (status = 422, description = "Validation failed", body = BlogDraft)
    )
)]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<BlogEnvelope>, JsonRejection>,
) -> Result<Outcome, AppError> {
    let Json(BlogEnvelope { blog: params }) = payload?;

    if policy::premium(&user, &params) != Access::Allowed {
        return Ok(premium_required(&user));
    }

    let draft = BlogDraft::from(params.sanitize());
    match state.repo.insert_blog(user.id, &draft).await {
        Ok(blog) => {
            tracing::info!(blog_id = %blog.id, user_id = %user.id, "blog created");
            Ok(Outcome::redirect(
                blog_path(blog.id),
                Flash::notice(CREATED_NOTICE),
            ))
        }
        Err(SaveError::Invalid(errors)) => Ok(Outcome::unprocessable(Page::New {
            blog: draft,
            errors,
        })),
        Err(SaveError::Store(e)) => Err(e.into()),
    }
}

/// update
///
/// [Authenticated Route] Updates a blog the requester owns with the submitted fields only.
///
/// The existence and ownership checks run before the body is even looked at, then the premium
/// gate, then sanitization.
#[utoipa::path(
    patch,
    path = "/blogs/{id}",
    params(("id" = Uuid, Path, description = "Blog ID")),
    request_body = BlogEnvelope,
    responses(
        (status = 302, description = "Updated, or premium feature refused"),
        (status = 404, description = "Not found, or not owner"),
        (status = 422, description = "Validation failed", body = Blog)
    )
)]
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<BlogEnvelope>, JsonRejection>,
) -> Result<Outcome, AppError> {
    let mut blog = set_blog(&state, id).await?;
    require(policy::ownership(&blog, &user), &blog)?;

    let Json(BlogEnvelope { blog: params }) = payload?;

    if policy::premium(&user, &params) != Access::Allowed {
        return Ok(premium_required(&user));
    }

    blog.assign(params.sanitize());
    match state.repo.save_blog(&blog).await {
        Ok(saved) => {
            tracing::info!(blog_id = %saved.id, user_id = %user.id, "blog updated");
            Ok(Outcome::redirect(
                blog_path(saved.id),
                Flash::notice(UPDATED_NOTICE),
            ))
        }
        Err(SaveError::Invalid(errors)) => Ok(Outcome::unprocessable(Page::Edit { blog, errors })),
        Err(SaveError::Store(e)) => Err(e.into()),
    }
}

/// destroy
///
/// [Authenticated Route] Permanently deletes a blog the requester owns, then redirects to the
/// listing with 303 See Other so a refresh cannot replay the DELETE.
///
/// A deletion the store cannot complete is a server error; it is never swallowed.
#[utoipa::path(
    delete,
    path = "/blogs/{id}",
    params(("id" = Uuid, Path, description = "Blog ID")),
    responses(
        (status = 303, description = "Deleted"),
        (status = 404, description = "Not found, or not owner"),
        (status = 500, description = "Deletion failed")
    )
)]
pub async fn destroy(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Outcome, AppError> {
    let blog = set_blog(&state, id).await?;
    require(policy::ownership(&blog, &user), &blog)?;

    state.repo.destroy_blog(blog.id).await?;
    tracing::info!(blog_id = %blog.id, user_id = %user.id, "blog destroyed");

    Ok(Outcome::see_other(BLOGS_PATH, Flash::notice(DESTROYED_NOTICE)))
}
