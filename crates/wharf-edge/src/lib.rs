//! Edge tier publication: HMAC-signed, gzip-compressed document pushes
//! from the authoritative tier to edge nodes, and the receiving side's
//! verify-and-commit handler.

pub mod error;
pub mod payload;
pub mod publisher;
pub mod receiver;
pub mod signature;

pub use error::{EdgeError, Result};
pub use payload::{gunzip, gzip, PushRequest};
pub use publisher::{EdgePublisher, PushFile, PushOutcome, PushResult};
pub use receiver::{receive_push, PushStatus};
pub use signature::{sign, verify};
