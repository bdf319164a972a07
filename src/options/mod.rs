pub mod position;
pub mod quote;

pub use position::{OptionPosition, PositionError};
pub use quote::{Quote, Right};
