//! Messages published on the [`Publisher`](crate::app::services::publisher::Publisher).
//!
//! Every message names the controller it is about. Controllers stay
//! addressable through the chief after removal, so a subscriber can still
//! look the id up once dispatch has finished.

use std::path::PathBuf;

use crate::app::controllers::data::ControllerId;
use crate::app::domain::document::DataKind;

/// A message type that can travel on the publisher bus.
pub trait Message: 'static {
    /// Name used in logs and in subscriber error reports.
    const TOPIC: &'static str;
}

/// A controller was detached from the project.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFileRemoved {
    pub controller: ControllerId,
    pub kind: DataKind,
    pub source: Option<PathBuf>,
}

impl Message for DataFileRemoved {
    const TOPIC: &'static str = "data file removed";
}

/// A controller's document was replaced from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataReloaded {
    pub controller: ControllerId,
    /// Children dropped because their files vanished.
    pub dropped: Vec<ControllerId>,
    /// Children created for files that appeared.
    pub added: Vec<ControllerId>,
}

impl Message for DataReloaded {
    const TOPIC: &'static str = "data reloaded";
}

/// A controller's document was written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSaved {
    pub controller: ControllerId,
    pub source: PathBuf,
}

impl Message for DataSaved {
    const TOPIC: &'static str = "data saved";
}

/// A controller's document was edited in memory and now has unsaved changes.
#[derive(Debug, Clone, PartialEq)]
pub struct DataModified {
    pub controller: ControllerId,
}

impl Message for DataModified {
    const TOPIC: &'static str = "data modified";
}

/// A resource entered the project-wide registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAdded {
    pub controller: ControllerId,
    pub source: PathBuf,
}

impl Message for ResourceAdded {
    const TOPIC: &'static str = "resource added";
}

/// A directory suite lost its init file.
#[derive(Debug, Clone, PartialEq)]
pub struct InitFileRemoved {
    pub controller: ControllerId,
    pub source: PathBuf,
}

impl Message for InitFileRemoved {
    const TOPIC: &'static str = "init file removed";
}
