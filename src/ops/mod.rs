//! Tensor operations built on the view engine
//!
//! - [`broadcast`]: common broadcast shapes and stride-0 expansion
//! - [`indexing`]: basic and advanced indexing, masked and scattered writes
//! - [`dispatch`]: runtime dtype dispatch (`dispatch_dtype!`)
//!
//! Every operation here either returns a view sharing storage with its
//! input, or documents that it materializes a new buffer.

pub mod broadcast;
pub mod dispatch;
pub mod indexing;

pub use broadcast::{broadcast_pair, broadcast_shape, broadcast_shapes, broadcast_tensors};
pub use indexing::{IndexTerm, nonzero};
