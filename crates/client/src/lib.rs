//! HTTP clients for linkmeta.
//!
//! This crate provides the `reqwest` implementations of the remote metadata
//! providers and the recommendation source consumed by `linkmeta-core`.

pub mod embedly;
pub mod error;
pub mod http;
pub mod mozilla;
pub mod pocket;

pub use embedly::{EmbedlyConfig, EmbedlyProvider};
pub use error::ClientError;
pub use http::HttpSettings;
pub use mozilla::{MozillaConfig, MozillaProvider};
pub use pocket::{PocketConfig, PocketSource};
