//! Visio Store - Chat state ownership and persistence
//!
//! `ChatStore` owns every chat, folder and the current-chat pointer. Callers
//! mutate it through explicit methods and persist it explicitly with
//! [`ChatStore::save`]; appending a message runs the summary staleness check
//! in the same call.

mod error;
mod export;
mod storage;
mod store;

pub use error::StoreError;
pub use export::{export_chat, ExportFormat, UnknownExportFormat};
pub use storage::{atomic_write, default_store_path, ChatStorage, StoreSnapshot};
pub use store::ChatStore;
