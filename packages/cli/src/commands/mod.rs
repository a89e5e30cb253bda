pub mod parse;
pub mod replay;

pub use parse::{parse, ParseArgs};
pub use replay::{replay, ReplayArgs};
