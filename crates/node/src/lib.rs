//! Oracle node runtime: the signing HTTP server and the request file exchange.

pub mod router;
pub mod store;

pub use router::{create_router, AppState};
pub use store::RequestStore;
