//! Logical streams and layered composition

mod composer;
mod logical;

pub use composer::compose;
pub use logical::{LayeredStream, LeafSource, LeafStream, LogicalStream, MergeRule};
pub(crate) use composer::check_agreement;
