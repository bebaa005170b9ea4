//! HTTP Handlers

mod chapter;
mod job;
mod ping;
mod story;
mod voice;

pub use chapter::*;
pub use job::*;
pub use ping::*;
pub use story::*;
pub use voice::*;
