//! Client-side job orchestration for a remote AI photo filter service.
//!
//! The crate manages an ephemeral session token, registers photos as remote
//! resources, submits filter jobs and waits for their results over a push
//! channel. Presentation only talks to [`EditSessionController`] (plus
//! [`CatalogClient`] to list filters) and renders the [`EditState`] it
//! publishes.
//!
//! ```ignore
//! let services = Services::from_config(ClientConfig::default())?;
//! let filters = services.catalog.list_filters().await?;
//!
//! let edit = services.edit_session();
//! edit.load_photo(bytes, "image/jpeg", "cat.jpg").await?;
//! if let FilterOutcome::Processed(url) = edit.apply_filter(&filters[0].id).await? {
//!     println!("{url}");
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod jobs;
pub mod listener;
pub mod retry;
pub mod services;
pub mod session;
pub mod uploader;

pub use api::{ApiClient, RequestError};
pub use catalog::{CatalogClient, DuplicateFilterPolicy, Filter, categories, flatten_catalog};
pub use config::ClientConfig;
pub use controller::{EditSessionController, EditState, FilterOutcome, LoadOutcome, LocalImage, Phase};
pub use error::{Error, ProcessingError, Result};
pub use jobs::{Job, JobStatus, JobSubmitter};
pub use listener::{ListenerSettings, PendingListen, ProcessingListener};
pub use retry::RetryPolicy;
pub use services::Services;
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionManager, TokenStore};
pub use snapfilter_protocol::ProcessingEstimate;
pub use uploader::ResourceUploader;
