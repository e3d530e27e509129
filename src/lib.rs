//! In-memory model of a Robot Framework test project kept in sync with the
//! files on disk.

pub mod app;

pub use app::{
    AppError, ChiefController, Command, ControllerId, DataController, DataKind, Document, EditorSettings,
    FileStamp, ImportKind, Message, ParentLink, Publisher, Result, SubscriptionId,
};
