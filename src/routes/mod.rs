//! Router Module Index
//!
//! Splits the routing table by access level. Authentication is applied as a layer on
//! the whole `authenticated` router, so a handler placed there can never be reached
//! anonymously.

/// Routes accessible to all clients (anonymous, read-only plus sign-up/sign-in).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Per-resource rules (teacher, member, author) are decided by the engine.
pub mod authenticated;
