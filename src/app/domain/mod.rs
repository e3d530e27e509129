//! Domain layer - core data structures and types.
//!
//! This module contains the fundamental domain models:
//! - Document and its tables
//! - FileStamp for external change detection
//! - Editor settings
//! - Message types for the publisher bus

pub mod document;
pub mod messages;
pub mod settings;
pub mod stamp;

pub use document::{
    DataKind, Document, Import, ImportKind, RawTable, Setting, SettingRow, SettingTable, Step, TestCase, UserKeyword,
    Variable,
};
pub use messages::{DataFileRemoved, DataModified, DataReloaded, DataSaved, InitFileRemoved, Message, ResourceAdded};
pub use settings::EditorSettings;
pub use stamp::FileStamp;
