//! Client for the todoable lists-and-items API.
//!
//! # Overview
//! `TodoableClient` is an authenticating request pipeline: it obtains a token
//! from `POST /authenticate` with HTTP basic credentials, caches it until its
//! `expires_at`, attaches it to every resource call, and classifies each
//! response into an [`Outcome`]. The List and Item endpoints are thin
//! wrappers over [`TodoableClient::execute`].
//!
//! # Design
//! - The network sits behind the [`Transport`] trait. `UreqTransport`
//!   (default `ureq` feature) is the blocking implementation; tests script
//!   their own.
//! - Time comes from a [`Clock`] so token expiry is testable.
//! - No global state: every call site owns or borrows its client.
//! - One `Result<T, ApiError>` per operation; callers branch on the variant.
//!
//! ```no_run
//! # #[cfg(feature = "ureq")]
//! # fn main() -> Result<(), todoable_core::ApiError> {
//! use todoable_core::{Configuration, NewList, TodoableClient, UreqTransport};
//!
//! let config = Configuration::from_env().with_credentials("alice@example.com", "todoable");
//! let mut client = TodoableClient::new(&config, UreqTransport::new())?;
//! let list = client.create_list(&NewList::new("Groceries"))?;
//! let fetched = client.get_list(&list.id)?;
//! assert_eq!(fetched.name, "Groceries");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ureq"))]
//! # fn main() {}
//! ```

pub mod auth;
pub mod classify;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod resources;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;

pub use auth::{AuthState, Token, TokenCache};
pub use classify::{classify, Outcome};
pub use client::TodoableClient;
pub use clock::{Clock, SystemClock};
pub use config::{Configuration, Credentials, DEFAULT_BASE_URI};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use models::Resource;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Item, List, NewItem, NewList};
