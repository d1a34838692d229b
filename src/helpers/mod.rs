//! Small text helpers shared by the markdown engine and the converter

mod date;
mod html;

pub use date::*;
pub use html::*;
