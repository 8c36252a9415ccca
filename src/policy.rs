use crate::{
    auth::AuthUser,
    models::{Blog, BlogParams},
};

/// Access
///
/// The outcome of a single guard. Handlers compose guards explicitly before touching the store,
/// turning each `Denied` into the response its reason calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied(Denial),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The blog is secret and the requester is not its owner.
    Secret,
    /// The requester does not own the blog.
    NotOwner,
    /// A premium-only field was submitted by a regular account.
    PremiumRequired,
}

impl Access {
    fn deny_unless(allowed: bool, reason: Denial) -> Self {
        if allowed {
            Access::Allowed
        } else {
            Access::Denied(reason)
        }
    }
}

/// visibility
///
/// Secret blogs are readable by their owner only. Anonymous viewers pass `None`.
pub fn visibility(blog: &Blog, viewer: Option<&AuthUser>) -> Access {
    Access::deny_unless(
        !blog.secret || blog.owned_by(viewer.map(|u| u.id)),
        Denial::Secret,
    )
}

/// ownership
///
/// Edit, update and destroy require ownership, whatever the blog's visibility.
pub fn ownership(blog: &Blog, user: &AuthUser) -> Access {
    Access::deny_unless(blog.owned_by(Some(user.id)), Denial::NotOwner)
}

/// premium
///
/// Submitting `random_eyecatch` at all is reserved for premium accounts. When the field is
/// absent the user's plan does not matter.
pub fn premium(user: &AuthUser, params: &BlogParams) -> Access {
    Access::deny_unless(
        user.premium || params.random_eyecatch.is_none(),
        Denial::PremiumRequired,
    )
}
