//! Client side of the relay: sends transcripts to the proxy and renders
//! replies, optionally revealing them a token at a time.

mod client;
pub mod stream;

pub use client::{Conversation, HTML_ERROR_MESSAGE, RelayClient, RelayError, View, normalize_error_body};
pub use stream::{CancelHandle, Reveal, RevealEnd, RevealOutcome, reveal};
