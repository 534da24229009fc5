//! Shared helpers with no pipeline knowledge.

pub mod exec;
pub mod html;
pub mod mime;
pub mod path;
