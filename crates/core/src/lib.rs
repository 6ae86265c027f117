//! The xtemplate directive interpreter.
//!
//! A template is an XML document mixing literal markup with directive elements
//! in a reserved namespace (by default [`DEFAULT_NAMESPACE`]). The
//! [`TemplateProcessor`] walks the template, evaluates directives against a
//! stack of lexical scopes and writes the derived document to an output sink.
//!
//! ```no_run
//! use xtemplate_core::TemplateProcessor;
//!
//! let mut processor = TemplateProcessor::parse(
//!     r#"<xt:template xmlns:xt="http://pwall.net/xml/xt/1.0"><p>${greeting}</p></xt:template>"#,
//! )?;
//! processor.set_variable("greeting", "hello")?;
//! assert_eq!(processor.render_to_string()?, "<p>hello</p>");
//! # Ok::<(), xtemplate_core::TemplateError>(())
//! ```

pub mod bindings;
pub mod context;
pub(crate) mod directive;
pub mod error;
pub mod executor;
pub(crate) mod executor_handlers;
pub mod processor;
pub mod resolver;

pub use context::{Context, ScopeError, ScopeStack};
pub use error::{ErrorKind, TemplateError};
pub use executor::TemplateExecutor;
pub use processor::{OutputFormat, ParseOutputFormatError, ProcessorOptions, TemplateProcessor};
pub use resolver::{
    DocumentCache, DocumentLoader, DocumentSource, FileSource, HttpSource, InMemorySource,
    LoadError, UrlSource, resolve_href,
};

pub use xtemplate_dom::{Document, NodeRef};
pub use xtemplate_expr::{
    FunctionLibrary, JSTL_FUNCTIONS_NAMESPACE, StringFunctions, Value, is_valid_identifier,
};
pub use xtemplate_writer::{OutputSink, RecordingSink, Whitespace};

/// Namespace of directive elements unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "http://pwall.net/xml/xt/1.0";
