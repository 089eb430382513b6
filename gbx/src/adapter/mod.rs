pub mod callbacks;
mod calls;
