//! Services layer - format handling and cross-cutting utilities.
//!
//! - Plain-text parser and writer
//! - Directory discovery (loader)
//! - Publisher bus
//! - Text operations
//! - Tree rendering

pub mod loader;
pub mod parser;
pub mod publisher;
pub mod text_ops;
pub mod tree_render;
pub mod writer;
