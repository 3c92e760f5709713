//! Core of the inference review tool.
//!
//! An operator walks through the rows of an inference CSV, looks at each
//! image and assigns labels. This crate holds the parts of that workflow that
//! touch the filesystem:
//! - `resolve` finds the image a row refers to, even when the recorded path
//!   is stale
//! - `store` keeps the operator's labels in a crash-safe JSON document and
//!   batches edits
//! - `thumbnail` produces scaled copies for display
//! - `dataset` and `session` hold the rows and the operator's position
//!
//! Rendering, dialogs and spreadsheet export live in the application that
//! embeds this crate.

pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod resolve;
pub mod session;
pub mod store;
pub mod thumbnail;

pub use config::Settings;
pub use dataset::Dataset;
pub use error::{Result, ReviewError};
pub use resolve::PathResolver;
pub use session::SessionState;
pub use store::{EntryPatch, LabelEntry, LabelStore, PendingOp, PendingOpBuffer, ResumeMerger};
pub use thumbnail::{ImageCache, ThumbnailCache};
