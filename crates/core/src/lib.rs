#![forbid(unsafe_code)]

pub mod error;
pub mod model;

pub use error::ProgressError;
pub use model::{ItemId, PartialUpdate, ProgressDocument, Salvaged};
