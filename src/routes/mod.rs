/// Router Module Index
///
/// Splits the blog routes by access level. Authentication is applied as a layer on the
/// `authenticated` router as a whole, so a route cannot be exposed by forgetting an argument.

/// Routes accessible to everyone, signed in or not.
/// Secret blogs are filtered out by the handlers' visibility guard.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Ownership is checked inside each handler.
pub mod authenticated;
