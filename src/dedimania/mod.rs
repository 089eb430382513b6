//! Synchronization with the Dedimania ranking service.
//!
//! Every request is posted asynchronously, and its `Completion` is
//! delivered back to the event loop, which owns the `SessionManager`
//! and the `RecordStore`.

pub use dispatch::*;
pub use error::*;
pub use protocol::*;
pub use records::*;
pub use session::*;

pub mod codec;
mod dispatch;
mod error;
mod protocol;
mod records;
mod session;
