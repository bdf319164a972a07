pub mod feed;
pub mod import;
pub mod record;

pub use record::{ChainRecord, ChainSnapshot};
