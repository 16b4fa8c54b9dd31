//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (add or keep x-request-id)
//!     → middleware/request_span.rs (server span → TraceContext extension)
//!     → handlers.rs (run the pipeline stages in order)
//!     → response.rs (stage failure → 500 with a fixed message)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use handlers::{AnnotationQuery, CAT_GREETING};
pub use request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{Stage, StageError};
pub use server::{AppState, HttpServer};
