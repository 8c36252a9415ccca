use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    flash::Flash,
    models::{Blog, BlogDraft, ValidationErrors},
};

pub const ROOT_PATH: &str = "/";
pub const BLOGS_PATH: &str = "/blogs";

pub fn blog_path(id: Uuid) -> String {
    format!("{}/{}", BLOGS_PATH, id)
}

/// Page
///
/// The document handed to the view layer. The `view` tag names the template; the remaining keys
/// are its locals.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "view")]
pub enum Page {
    #[serde(rename = "blogs/index")]
    Index {
        blogs: Vec<Blog>,
        #[serde(skip_serializing_if = "Option::is_none")]
        term: Option<String>,
    },
    #[serde(rename = "blogs/show")]
    Show { blog: Blog },
    #[serde(rename = "blogs/new")]
    New {
        blog: BlogDraft,
        errors: ValidationErrors,
    },
    #[serde(rename = "blogs/edit")]
    Edit {
        blog: Blog,
        errors: ValidationErrors,
    },
}

/// Outcome
///
/// What a controller operation decided: either render a page, or redirect with a flash message.
/// Nothing is written to the response until the outcome is converted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Render {
        status: StatusCode,
        page: Page,
        flash: Option<Flash>,
    },
    Redirect {
        location: String,
        status: StatusCode,
        flash: Flash,
    },
}

#[derive(Serialize)]
struct RenderedPage<'a> {
    #[serde(flatten)]
    page: &'a Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    flash: Option<&'a Flash>,
}

impl Outcome {
    pub fn render(page: Page) -> Self {
        Outcome::Render {
            status: StatusCode::OK,
            page,
            flash: None,
        }
    }

    /// A form re-rendered with validation errors.
    pub fn unprocessable(page: Page) -> Self {
        Outcome::Render {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            page,
            flash: None,
        }
    }

    pub fn redirect(location: impl Into<String>, flash: Flash) -> Self {
        Outcome::Redirect {
            location: location.into(),
            status: StatusCode::FOUND,
            flash,
        }
    }

    /// Redirect after a destructive request. Clients must follow it with a GET.
    pub fn see_other(location: impl Into<String>, flash: Flash) -> Self {
        Outcome::Redirect {
            location: location.into(),
            status: StatusCode::SEE_OTHER,
            flash,
        }
    }

    /// Attaches the flash carried over from the previous redirect, if any.
    pub fn with_flash(self, incoming: Option<Flash>) -> Self {
        match self {
            Outcome::Render { status, page, .. } => Outcome::Render {
                status,
                page,
                flash: incoming,
            },
            redirect => redirect,
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Render {
                status,
                page,
                flash,
            } => {
                let body = RenderedPage {
                    page: &page,
                    flash: flash.as_ref(),
                };
                let mut response = (status, Json(body)).into_response();
                if flash.is_some() {
                    response
                        .headers_mut()
                        .insert(header::SET_COOKIE, Flash::clear_cookie());
                }
                response
            }
            Outcome::Redirect {
                location,
                status,
                flash,
            } => {
                let mut response = status.into_response();
                match header::HeaderValue::try_from(location) {
                    Ok(value) => {
                        response.headers_mut().insert(header::LOCATION, value);
                    }
                    Err(e) => {
                        tracing::error!("invalid redirect location: {:?}", e);
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                }
                response
                    .headers_mut()
                    .insert(header::SET_COOKIE, flash.to_cookie());
                response
            }
        }
    }
}
