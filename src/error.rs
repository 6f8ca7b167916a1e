//! Main Crate Error

#[derive(thiserror::Error, Debug)]
/// Hoptrace crate error enum.
pub enum Error {
    /// Indicates that the message passed to [Id::from_bytes](crate::Id::from_bytes)
    /// is not of the expected length.
    #[error("Invalid Id size: {0}")]
    InvalidIdSize(usize),
}
