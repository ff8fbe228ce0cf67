//! HTTP middleware stack for the server.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. CORS (the mini-app may be served from another origin)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
