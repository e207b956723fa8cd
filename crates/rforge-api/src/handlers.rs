//! Request handlers.

pub mod health;
pub mod images;
pub mod videos;

pub use health::*;
pub use images::*;
pub use videos::*;
