mod router;
pub use router::{PASSWORD_HEADER, router};
pub mod public;
