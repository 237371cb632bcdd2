//! Client-side session handling
//!
//! The browser half of the system: a persisted token store, a navigation
//! guard that never touches the network, login/logout, and an API client
//! that sends the stored bearer token.
//!
//! # Example
//!
//! ```rust,ignore
//! use rolegate::client::{FileStore, Session, TokenStore};
//!
//! let store = TokenStore::new(FileStore::open("session.json")?);
//! let session = Session::new(store, provider);
//! let next = session.complete_login(&id_token).await?.destination;
//! ```

pub mod api;
pub mod guard;
pub mod session;
pub mod storage;
pub mod store;

pub use api::ApiClient;
pub use guard::{Navigation, RouteGuard};
pub use session::{LoginOutcome, Session};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::TokenStore;
