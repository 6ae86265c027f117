//! XML template processing.
//!
//! Re-exports the interpreter from `xtemplate-core` and adds the command line
//! surface used by the `xtemplate` binary.

pub mod cli;

pub use xtemplate_core::*;
