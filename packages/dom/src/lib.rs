//! # Trellis DOM
//!
//! The live tree that segments are tracked in.
//!
//! - [`Tree`]: arena of nodes addressed by stable [`NodeId`] handles
//! - [`parse_fragment`]: lenient markup → detached fragment
//! - [`to_markup`]: fragment/node → markup

pub mod error;
pub mod lexer;
pub mod markup;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use markup::{
    decode_entities, is_void_element, parse_fragment, to_markup, FixKind, ParsedFragment,
    StructureFix,
};
pub use tree::{Element, NodeId, NodeKind, Tree};

#[cfg(feature = "pretty-errors")]
pub use markup::format_fixes;
