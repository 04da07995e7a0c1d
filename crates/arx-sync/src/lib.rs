//! Push/pull synchronization between Arx repositories.
//!
//! A remote is anything implementing [`RemoteTransport`]: an
//! [`HttpRemote`] talking to a server built with [`build_router`], or a
//! [`LocalTransport`] wrapping a [`RepositoryHost`] in the same process.
//! [`SyncEngine`] drives push and pull over either.
//!
//! Wire protocol (JSON):
//!
//! - `GET /refs` lists `{name, target, kind}`
//! - `POST /objects/batch {ids}` returns the stored objects among `ids`
//! - `PUT /objects/batch [Object..]` stores verified objects
//! - `POST /refs [RefUpdate..]` moves refs with compare-and-swap
//! - `GET /info` returns `{name, description, version, updated}`

pub mod auth;
pub mod engine;
pub mod error;
pub mod host;
pub mod http;
pub mod local;
pub mod server;
pub mod transport;
pub mod types;

pub use auth::AuthMethod;
pub use engine::{PullOptions, SyncEngine, BATCH_SIZE};
pub use error::{SyncError, SyncResult};
pub use host::RepositoryHost;
pub use http::HttpRemote;
pub use local::LocalTransport;
pub use server::{build_router, ApiError, ArxServer, ServerConfig};
pub use transport::RemoteTransport;
pub use types::{
    FetchRequest, Overwrite, PullReport, PushReport, RefKind, RefUpdate, RefUpdateResult,
    RemoteRef, RepoInfo, StoreResponse,
};
