pub use api::*;
pub use client::*;
pub use xml::{Call, Fault, Value};

mod adapter;
mod api;
mod client;
pub mod xml;
