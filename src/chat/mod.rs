pub use message::*;

mod message;
