use crate::orders::Side;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BookError {
    /// Top-of-book query on a side with no resting liquidity.
    #[error("no resting orders on the {0:?} side")]
    EmptyBook(Side),

    /// An order that cannot rest on the book.
    #[error("invalid order: {0}")]
    InvalidOrder(&'static str),
}
