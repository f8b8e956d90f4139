#![forbid(unsafe_code)]

pub mod file;
pub mod memory;
pub mod source;

pub use crate::file::JsonLinesSource;
pub use crate::memory::MemorySource;
pub use crate::source::{ItemSource, ItemStream, SourceError};
