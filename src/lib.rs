pub mod cli;
pub mod error;
pub mod formats;
pub mod models;
pub mod services;

pub use error::{PipelineError, ProcessingError};
pub use models::{Batch, Chunk, ChunkOptions, Config, SourceFile};
