mod trait_source;

pub use trait_source::{ItemSource, ItemStream, SourceError};
