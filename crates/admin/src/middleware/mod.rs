//! HTTP middleware and extractors for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authorization is per handler, through the [`auth`] extractors.

pub mod auth;
pub mod session;

pub use auth::{AdminAuthRejection, RequireAdminRole, set_current_admin};
pub use session::create_session_layer;
