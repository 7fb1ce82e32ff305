//! Operation history and undo/redo engine for collaborative content canvases.
//!
//! Every mutating action against a content entity is recorded as an
//! immutable [`operation::Operation`]: identity tags, a minimal changed-field
//! diff, a security classification, and producer metadata, persisted through
//! an [`persist::OperationStore`]. Successful records feed session-local
//! bounded undo/redo stacks, best-effort realtime broadcast channels, and a
//! fire-and-forget achievement trigger.
//!
//! # Examples
//!
//! Recording and undoing against the SQLite store:
//! ```
//! use canvaslog::{
//!     identity::IdentityContext,
//!     operation::RecordOptions,
//!     persist::sqlite::SqliteOperationStore,
//!     runtime::engine::{EngineConfig, HistoryEngine},
//!     types::OpKind,
//! };
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteOperationStore::open_in_memory().expect("open store");
//! let engine = HistoryEngine::new(
//!     IdentityContext::ephemeral(),
//!     Box::new(store),
//!     EngineConfig::default(),
//! );
//!
//! let op = engine
//!     .record(
//!         "user-1",
//!         OpKind::Create,
//!         "canvas_items",
//!         "item-1",
//!         None,
//!         Some(json!({"kind": "note", "text": "hello"})),
//!         RecordOptions::default(),
//!     )
//!     .await
//!     .expect("record");
//! assert!(engine.can_undo().await);
//!
//! let outcome = engine.undo(&op.user_id).await.expect("undo");
//! assert_eq!(outcome.target_id, "item-1");
//! assert!(engine.can_redo().await);
//! # }
//! ```
#![deny(missing_docs)]

/// Pure computations: diff, classification, stacks.
pub mod core;
/// Session and device identity.
pub mod identity;
/// Operation record and projection types.
pub mod operation;
/// Store trait and SQLite implementation.
pub mod persist;
/// Engine, broadcast channels, and achievement boundary.
pub mod runtime;
/// Shared identifier aliases and enums.
pub mod types;
