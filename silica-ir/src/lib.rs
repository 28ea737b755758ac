//! Bit-vector types and the SSA signal graph of the Silica hardware frontend.
//!
//! A [`Graph`] owns the immutable expression nodes of one module under
//! construction. Nodes are interned: structurally equal nodes share one
//! [`SigId`], constants fold at construction and the width rules of every
//! opcode are checked before a node is allocated.

#![warn(missing_docs)]

mod bits;
mod error;
mod fold;
mod graph;
mod node;

pub use bits::BitVec;
pub use error::WidthError;
pub use fold::{encode_const, from_signed, mask, to_signed, truncate};
pub use graph::Graph;
pub use node::{CmpVariant, InstId, MemId, Node, Op, RegId, SigId};
