pub use gbx::{Callback as ServerEvent, *};
