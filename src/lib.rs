pub mod db;
pub mod error;
pub mod library;
pub mod models;
pub mod permission;
pub mod pipeline;
pub mod utils;

pub use error::{MediaError, MediaResult};
pub use library::PhotoLibrary;
pub use pipeline::session::MediaStream;
pub use pipeline::transform::ImageOutput;
