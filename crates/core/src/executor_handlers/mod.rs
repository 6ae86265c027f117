//! Runtime handlers for template directives.

pub(crate) mod control_flow;
pub(crate) mod copy;
pub(crate) mod diagnostics;
pub(crate) mod include;
pub(crate) mod literals;
pub(crate) mod loops;
pub(crate) mod output;
pub(crate) mod variables;
