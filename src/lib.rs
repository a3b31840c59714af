pub mod boundary;
pub mod config;
pub mod error;
pub mod fetch;
pub mod html;
pub mod palette;
pub mod pipeline;
pub mod projection;
pub mod registry;
pub mod resolver;
pub mod stage;
pub mod svg;

pub use error::{MapError, Result};
