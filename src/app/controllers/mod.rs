//! Controllers layer - orchestration and coordination.
//!
//! - `data` - one controller per suite, resource or directory
//! - `chief` - the project root: arena, registry, load/reload/save/remove
//! - `commands` - structural edits executed against a controller

pub mod chief;
pub mod commands;
pub mod data;
