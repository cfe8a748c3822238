//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! - [`SqliteRecordStore`]: `StoreAdapter` persisted in a single SQLite file
//! - [`ReqwestHttpClient`]: `HttpClient` using `reqwest` with retry
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteRecordStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let store = SqliteRecordStore::new("library.db".into()).await?;
//!     let http = ReqwestHttpClient::new()?;
//!     // hand both to core-service
//!     Ok(())
//! }
//! ```

mod http;
mod store;

pub use http::ReqwestHttpClient;
pub use store::SqliteRecordStore;
