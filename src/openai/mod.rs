mod core;
mod envelope;

pub use self::core::*;
pub use envelope::{error_message, extract_text};
