pub mod error;
pub mod types;
pub mod validation;

pub use error::*;
pub use types::*;
