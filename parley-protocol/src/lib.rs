mod data;
mod event;

pub use data::*;
pub use event::*;
