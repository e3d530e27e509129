//! Application layer - organized by Clean Architecture principles.
//!
//! # Structure
//!
//! - `domain/` - Core data structures (Document, FileStamp, Settings, Messages)
//! - `controllers/` - Orchestration (ChiefController, DataController, Command)
//! - `services/` - Format handling and utilities (parser, writer, loader, publisher)
//! - `infrastructure/` - Filesystem helpers and error types

pub mod controllers;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-exports for convenient external access
pub use controllers::chief::ChiefController;
pub use controllers::commands::Command;
pub use controllers::data::{ControllerId, DataController, ParentLink};
pub use domain::{DataKind, Document, EditorSettings, FileStamp, ImportKind, Message};
pub use infrastructure::error::{AppError, Operation, Result};
pub use services::publisher::{Publisher, SubscriptionId};
