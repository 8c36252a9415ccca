use async_trait::async_trait;
use axum::{
    Json,
    body::Body,
    extract::{FromRequest, Path, Query, State, rejection::JsonRejection},
    http::{Request, StatusCode},
};
use blog_portal::{
    AppConfig, AppState, InMemoryRepository,
    auth::{AuthUser, CurrentUser},
    error::{AppError, RepositoryError, SaveError},
    flash::{Flash, FlashKind, IncomingFlash},
    handlers::{self, BlogFilter},
    models::{Blog, BlogDraft, BlogEnvelope, User},
    outcome::{Outcome, Page},
    repository::{BlogQuery, Repository, RepositoryState},
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- TEST UTILITIES ---

const OWNER_ID: Uuid = Uuid::from_u128(1);
const STRANGER_ID: Uuid = Uuid::from_u128(2);

fn owner() -> AuthUser {
    AuthUser {
        id: OWNER_ID,
        premium: false,
    }
}

fn premium_owner() -> AuthUser {
    AuthUser {
        id: OWNER_ID,
        premium: true,
    }
}

fn stranger() -> AuthUser {
    AuthUser {
        id: STRANGER_ID,
        premium: true,
    }
}

fn fixture(title: &str, secret: bool, minutes: i64) -> Blog {
    let created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
    Blog {
        id: Uuid::new_v4(),
        user_id: OWNER_ID,
        title: title.to_string(),
        content: format!("About {}", title),
        secret,
        random_eyecatch: false,
        created_at,
        updated_at: created_at,
    }
}

fn envelope(value: serde_json::Value) -> Result<Json<BlogEnvelope>, JsonRejection> {
    Ok(Json(serde_json::from_value(value).unwrap()))
}

async fn create_test_state(blogs: Vec<Blog>) -> (Arc<InMemoryRepository>, AppState) {
    let repo = Arc::new(InMemoryRepository::new());
    for (id, premium) in [(OWNER_ID, false), (STRANGER_ID, true)] {
        repo.add_user(User {
            id,
            email: format!("{}@test.com", id),
            premium,
        })
        .await;
    }
    for blog in blogs {
        repo.seed_blog(blog).await;
    }

    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    (repo, state)
}

async fn all_blogs(repo: &InMemoryRepository) -> Vec<Blog> {
    repo.list_blogs(&BlogQuery::search(None)).await.unwrap()
}

fn assert_redirect(outcome: &Outcome, expected_location: &str, expected_status: StatusCode) -> Flash {
    match outcome {
        Outcome::Redirect {
            location,
            status,
            flash,
        } => {
            assert_eq!(location, expected_location);
            assert_eq!(*status, expected_status);
            flash.clone()
        }
        other => panic!("expected a redirect, got {:?}", other),
    }
}

// --- SHOW / VISIBILITY ---

#[test]
async fn test_show_secret_blog_is_hidden_from_anonymous_and_strangers() {
    let secret = fixture("Diary", true, 0);
    let (_repo, state) = create_test_state(vec![secret.clone()]).await;

    let anonymous = handlers::show(
        CurrentUser(None),
        State(state.clone()),
        Path(secret.id),
        IncomingFlash(None),
    )
    .await;
    assert!(matches!(anonymous, Err(AppError::NotFound)));

    let other = handlers::show(
        CurrentUser(Some(stranger())),
        State(state),
        Path(secret.id),
        IncomingFlash(None),
    )
    .await;
    assert!(matches!(other, Err(AppError::NotFound)));
}

#[test]
async fn test_show_secret_blog_to_its_owner() {
    let secret = fixture("Diary", true, 0);
    let (_repo, state) = create_test_state(vec![secret.clone()]).await;

    let outcome = handlers::show(
        CurrentUser(Some(owner())),
        State(state),
        Path(secret.id),
        IncomingFlash(None),
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::render(Page::Show { blog: secret }));
}

#[test]
async fn test_show_public_blog_to_anonymous() {
    let public = fixture("Hello", false, 0);
    let (_repo, state) = create_test_state(vec![public.clone()]).await;

    let outcome = handlers::show(
        CurrentUser(None),
        State(state),
        Path(public.id),
        IncomingFlash(None),
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::render(Page::Show { blog: public }));
}

#[test]
async fn test_show_missing_blog_is_not_found() {
    let (_repo, state) = create_test_state(vec![]).await;

    let result = handlers::show(
        CurrentUser(Some(owner())),
        State(state),
        Path(Uuid::new_v4()),
        IncomingFlash(None),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[test]
async fn test_show_carries_incoming_flash() {
    let public = fixture("Hello", false, 0);
    let (_repo, state) = create_test_state(vec![public.clone()]).await;
    let flash = Flash::notice(handlers::CREATED_NOTICE);

    let outcome = handlers::show(
        CurrentUser(None),
        State(state),
        Path(public.id),
        IncomingFlash(Some(flash.clone())),
    )
    .await
    .unwrap();

    match outcome {
        Outcome::Render { flash: carried, .. } => assert_eq!(carried, Some(flash)),
        other => panic!("expected a render, got {:?}", other),
    }
}

// --- INDEX ---

#[test]
async fn test_index_lists_published_blogs_newest_first() {
    let oldest = fixture("Rust ownership", false, 0);
    let hidden = fixture("Rust secrets", true, 5);
    let middle = fixture("Gardening", false, 10);
    let newest = fixture("Async rust", false, 20);
    let (_repo, state) = create_test_state(vec![
        oldest.clone(),
        hidden,
        middle.clone(),
        newest.clone(),
    ])
    .await;

    let outcome = handlers::index(
        State(state.clone()),
        Query(BlogFilter {
            term: Some(String::new()),
        }),
        IncomingFlash(None),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        Outcome::render(Page::Index {
            blogs: vec![newest.clone(), middle, oldest.clone()],
            term: None,
        })
    );

    let outcome = handlers::index(
        State(state),
        Query(BlogFilter {
            term: Some("rust".to_string()),
        }),
        IncomingFlash(None),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        Outcome::render(Page::Index {
            blogs: vec![newest, oldest],
            term: Some("rust".to_string()),
        })
    );
}

#[test]
async fn test_index_breaks_timestamp_ties_by_id() {
    let mut low = fixture("Low", false, 0);
    low.id = Uuid::from_u128(10);
    let mut high = fixture("High", false, 0);
    high.id = Uuid::from_u128(20);
    // Insertion order must not decide the tie.
    let (_repo, state) = create_test_state(vec![high.clone(), low.clone()]).await;

    let outcome = handlers::index(
        State(state),
        Query(BlogFilter::default()),
        IncomingFlash(None),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        Outcome::render(Page::Index {
            blogs: vec![high, low],
            term: None,
        })
    );
}

// --- NEW / EDIT ---

#[test]
async fn test_new_renders_an_empty_draft() {
    let outcome = handlers::new_blog(owner(), IncomingFlash(None)).await;

    match outcome {
        Outcome::Render { status, page, .. } => {
            assert_eq!(status, StatusCode::OK);
            match page {
                Page::New { blog, errors } => {
                    assert_eq!(blog, BlogDraft::default());
                    assert!(errors.is_empty());
                }
                other => panic!("expected the new form, got {:?}", other),
            }
        }
        other => panic!("expected a render, got {:?}", other),
    }
}

#[test]
async fn test_edit_own_blog() {
    let blog = fixture("Mine", true, 0);
    let (_repo, state) = create_test_state(vec![blog.clone()]).await;

    let outcome = handlers::edit(owner(), State(state), Path(blog.id), IncomingFlash(None))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Render { page: Page::Edit { blog: ref shown, .. }, .. } if *shown == blog
    ));
}

// --- OWNERSHIP ---

#[test]
async fn test_non_owner_cannot_edit_update_or_destroy_public_blog() {
    let blog = fixture("Public", false, 0);
    let (repo, state) = create_test_state(vec![blog.clone()]).await;

    let edit = handlers::edit(stranger(), State(state.clone()), Path(blog.id), IncomingFlash(None)).await;
    assert!(matches!(edit, Err(AppError::NotFound)));

    let update = handlers::update(
        stranger(),
        State(state.clone()),
        Path(blog.id),
        envelope(json!({ "blog": { "title": "Hijacked" } })),
    )
    .await;
    assert!(matches!(update, Err(AppError::NotFound)));

    let destroy = handlers::destroy(stranger(), State(state), Path(blog.id)).await;
    assert!(matches!(destroy, Err(AppError::NotFound)));

    assert_eq!(all_blogs(&repo).await, vec![blog]);
}

#[test]
async fn test_ownership_is_checked_before_parsing_the_body() {
    let blog = fixture("Secret", true, 0);
    let (_repo, state) = create_test_state(vec![blog.clone()]).await;

    // A broken body from a non-owner still reads as "no such blog".
    let request = Request::builder().body(Body::from("not json")).unwrap();
    let malformed = Json::<BlogEnvelope>::from_request(request, &()).await.unwrap_err();
    let result = handlers::update(stranger(), State(state), Path(blog.id), Err(malformed)).await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

// --- CREATE ---

#[test]
async fn test_create_redirects_to_new_blog() {
    let (repo, state) = create_test_state(vec![]).await;

    let outcome = handlers::create(
        owner(),
        State(state),
        envelope(json!({ "blog": { "title": "First", "content": "Hello", "secret": true } })),
    )
    .await
    .unwrap();

    let blogs = all_blogs(&repo).await;
    assert_eq!(blogs.len(), 1);
    let created = &blogs[0];
    assert_eq!(created.user_id, OWNER_ID);
    assert!(created.secret);
    assert!(!created.random_eyecatch);

    let flash = assert_redirect(&outcome, &format!("/blogs/{}", created.id), StatusCode::FOUND);
    assert_eq!(flash, Flash::notice(handlers::CREATED_NOTICE));
}

#[test]
async fn test_create_with_eyecatch_requires_premium() {
    let (repo, state) = create_test_state(vec![]).await;

    // Any submitted value counts, including false.
    for value in [json!(true), json!(false)] {
        let outcome = handlers::create(
            owner(),
            State(state.clone()),
            envelope(json!({ "blog": { "title": "T", "content": "C", "random_eyecatch": value } })),
        )
        .await
        .unwrap();

        let flash = assert_redirect(&outcome, "/", StatusCode::FOUND);
        assert_eq!(flash.kind, FlashKind::Error);
        assert_eq!(flash.message, handlers::PREMIUM_ONLY_ERROR);
    }

    assert!(all_blogs(&repo).await.is_empty());
}

#[test]
async fn test_create_with_eyecatch_as_premium() {
    let (repo, state) = create_test_state(vec![]).await;

    handlers::create(
        premium_owner(),
        State(state),
        envelope(json!({ "blog": { "title": "T", "content": "C", "random_eyecatch": true } })),
    )
    .await
    .unwrap();

    let blogs = all_blogs(&repo).await;
    assert_eq!(blogs.len(), 1);
    assert!(blogs[0].random_eyecatch);
}

#[test]
async fn test_create_with_null_eyecatch_ignores_premium() {
    let (repo, state) = create_test_state(vec![]).await;

    let outcome = handlers::create(
        owner(),
        State(state),
        envelope(json!({ "blog": { "title": "T", "content": "C", "random_eyecatch": null } })),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, Outcome::Redirect { status: StatusCode::FOUND, .. }));
    assert_eq!(all_blogs(&repo).await.len(), 1);
}

#[test]
async fn test_create_invalid_rerenders_new_form() {
    let (repo, state) = create_test_state(vec![]).await;

    let outcome = handlers::create(
        owner(),
        State(state),
        envelope(json!({ "blog": { "title": "  ", "content": "<b>kept</b>" } })),
    )
    .await
    .unwrap();

    match outcome {
        Outcome::Render {
            status,
            page: Page::New { blog, errors },
            ..
        } => {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(errors.on("title"), ["can't be blank".to_string()]);
            assert!(errors.on("content").is_empty());
            assert_eq!(blog.content, "&lt;b&gt;kept&lt;/b&gt;");
        }
        other => panic!("expected the new form, got {:?}", other),
    }
    assert!(all_blogs(&repo).await.is_empty());
}

#[test]
async fn test_create_ignores_fields_outside_the_whitelist() {
    let (repo, state) = create_test_state(vec![]).await;
    let spoofed_id = Uuid::new_v4();

    handlers::create(
        owner(),
        State(state),
        envelope(json!({
            "user_id": STRANGER_ID,
            "blog": {
                "title": "T",
                "content": "C",
                "id": spoofed_id,
                "user_id": STRANGER_ID,
                "created_at": "1999-01-01T00:00:00Z"
            }
        })),
    )
    .await
    .unwrap();

    let blogs = all_blogs(&repo).await;
    assert_eq!(blogs.len(), 1);
    assert_eq!(blogs[0].user_id, OWNER_ID);
    assert_ne!(blogs[0].id, spoofed_id);
    assert!(blogs[0].created_at > Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
}

// --- SANITIZATION ---

#[test]
async fn test_content_is_escaped_once_across_edits() {
    let (repo, state) = create_test_state(vec![]).await;

    handlers::create(
        owner(),
        State(state.clone()),
        envelope(json!({ "blog": { "title": "XSS", "content": "<script>alert(1)</script>" } })),
    )
    .await
    .unwrap();

    let stored = all_blogs(&repo).await.remove(0);
    assert_eq!(stored.content, "&lt;script&gt;alert(1)&lt;/script&gt;");

    // The edit form hands back the stored value unchanged.
    handlers::update(
        owner(),
        State(state),
        Path(stored.id),
        envelope(json!({ "blog": { "content": stored.content } })),
    )
    .await
    .unwrap();

    let resaved = all_blogs(&repo).await.remove(0);
    assert_eq!(resaved.content, "&lt;script&gt;alert(1)&lt;/script&gt;");
}

// --- UPDATE ---

#[test]
async fn test_update_merges_submitted_fields_only() {
    let blog = fixture("Before", false, 0);
    let (repo, state) = create_test_state(vec![blog.clone()]).await;

    let outcome = handlers::update(
        owner(),
        State(state),
        Path(blog.id),
        envelope(json!({ "blog": { "title": "After", "secret": true } })),
    )
    .await
    .unwrap();

    let flash = assert_redirect(&outcome, &format!("/blogs/{}", blog.id), StatusCode::FOUND);
    assert_eq!(flash, Flash::notice(handlers::UPDATED_NOTICE));

    let updated = all_blogs(&repo).await.remove(0);
    assert_eq!(updated.title, "After");
    assert!(updated.secret);
    assert_eq!(updated.content, blog.content);
    assert_eq!(updated.user_id, OWNER_ID);
}

#[test]
async fn test_update_with_eyecatch_requires_premium() {
    let blog = fixture("Plain", false, 0);
    let (repo, state) = create_test_state(vec![blog.clone()]).await;

    let outcome = handlers::update(
        owner(),
        State(state),
        Path(blog.id),
        envelope(json!({ "blog": { "title": "Changed", "random_eyecatch": true } })),
    )
    .await
    .unwrap();

    let flash = assert_redirect(&outcome, "/", StatusCode::FOUND);
    assert_eq!(flash, Flash::error(handlers::PREMIUM_ONLY_ERROR));
    assert_eq!(all_blogs(&repo).await, vec![blog]);
}

#[test]
async fn test_update_invalid_rerenders_edit_form() {
    let blog = fixture("Valid", false, 0);
    let (repo, state) = create_test_state(vec![blog.clone()]).await;

    let outcome = handlers::update(
        owner(),
        State(state),
        Path(blog.id),
        envelope(json!({ "blog": { "title": "", "content": "new body" } })),
    )
    .await
    .unwrap();

    match outcome {
        Outcome::Render {
            status,
            page: Page::Edit { blog: shown, errors },
            ..
        } => {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(errors.on("title"), ["can't be blank".to_string()]);
            // The form shows what was submitted, not what is stored.
            assert_eq!(shown.title, "");
            assert_eq!(shown.content, "new body");
        }
        other => panic!("expected the edit form, got {:?}", other),
    }
    assert_eq!(all_blogs(&repo).await, vec![blog]);
}

// --- DESTROY ---

#[test]
async fn test_destroy_removes_blog_and_redirects_with_see_other() {
    let blog = fixture("Doomed", false, 0);
    let (repo, state) = create_test_state(vec![blog.clone()]).await;

    let outcome = handlers::destroy(owner(), State(state.clone()), Path(blog.id))
        .await
        .unwrap();

    let flash = assert_redirect(&outcome, "/blogs", StatusCode::SEE_OTHER);
    assert_eq!(flash, Flash::notice(handlers::DESTROYED_NOTICE));
    assert!(all_blogs(&repo).await.is_empty());

    let show = handlers::show(
        CurrentUser(Some(owner())),
        State(state.clone()),
        Path(blog.id),
        IncomingFlash(None),
    )
    .await;
    assert!(matches!(show, Err(AppError::NotFound)));

    let edit = handlers::edit(owner(), State(state), Path(blog.id), IncomingFlash(None)).await;
    assert!(matches!(edit, Err(AppError::NotFound)));
}

/// Delegates to the in-memory store but cannot delete anything.
struct UndeletableRepo(InMemoryRepository);

#[async_trait]
impl Repository for UndeletableRepo {
    async fn list_blogs(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepositoryError> {
        self.0.list_blogs(query).await
    }
    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        self.0.find_blog(id).await
    }
    async fn insert_blog(&self, owner: Uuid, draft: &BlogDraft) -> Result<Blog, SaveError> {
        self.0.insert_blog(owner, draft).await
    }
    async fn save_blog(&self, blog: &Blog) -> Result<Blog, SaveError> {
        self.0.save_blog(blog).await
    }
    async fn destroy_blog(&self, id: Uuid) -> Result<(), RepositoryError> {
        Err(RepositoryError::Vanished(id))
    }
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.0.get_user(id).await
    }
}

#[test]
async fn test_destroy_failure_is_not_swallowed() {
    let blog = fixture("Stuck", false, 0);
    let inner = InMemoryRepository::new();
    inner.seed_blog(blog.clone()).await;
    let repo: RepositoryState = Arc::new(UndeletableRepo(inner));
    let state = AppState {
        repo,
        config: AppConfig::default(),
    };

    let result = handlers::destroy(owner(), State(state), Path(blog.id)).await;

    assert!(matches!(result, Err(AppError::Store(RepositoryError::Vanished(id))) if id == blog.id));
}
