#![doc = include_str!("../README.md")]

// Public modules
mod common;
mod error;

pub mod event;
pub mod lookup;

pub use crate::common::{Id, ID_SIZE};
pub use crate::error::Error;
pub use event::{EventSink, LookupEvent, TracingSink};
pub use lookup::{HopSnapshot, LookupSnapshot, LookupTracker};

pub type Result<T> = std::result::Result<T, Error>;
