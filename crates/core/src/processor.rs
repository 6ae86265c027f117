//! The public entry point: a parsed template plus its initial bindings and options.

use crate::DEFAULT_NAMESPACE;
use crate::context::Context;
use crate::directive::Directive;
use crate::error::{ErrorKind, TemplateError};
use crate::executor::TemplateExecutor;
use crate::resolver::{DocumentCache, DocumentLoader};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use xtemplate_dom::{Document, NodeRef};
use xtemplate_expr::{FunctionLibrary, Value};
use xtemplate_writer::{HtmlWriter, OutputSink, Whitespace, XmlWriter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Xml,
    Html,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal output: {0}")]
pub struct ParseOutputFormatError(pub String);

impl FromStr for OutputFormat {
    type Err = ParseOutputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("xml") {
            Ok(OutputFormat::Xml)
        } else if s.eq_ignore_ascii_case("html") {
            Ok(OutputFormat::Html)
        } else {
            Err(ParseOutputFormatError(s.to_string()))
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Html => "html",
        })
    }
}

/// Processing options. Attributes on the template root override these for a
/// single [`TemplateProcessor::process`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Namespace URI of directive elements and reserved attributes.
    pub namespace: String,
    pub whitespace: Whitespace,
    pub output: OutputFormat,
    /// Write an XML declaration before XML output.
    pub prefix_xml: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        ProcessorOptions {
            namespace: DEFAULT_NAMESPACE.to_string(),
            whitespace: Whitespace::default(),
            output: OutputFormat::default(),
            prefix_xml: false,
        }
    }
}

/// `true`/`yes` or `false`/`no`, ignoring case.
fn parse_prefix_option(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct TemplateProcessor {
    document: Arc<Document>,
    root: NodeRef,
    context: Context,
    options: ProcessorOptions,
    loader: DocumentLoader,
}

impl TemplateProcessor {
    /// Wraps a parsed template. `url` is the base for relative `<include>` hrefs.
    pub fn new(document: Arc<Document>, url: Option<Url>) -> Result<Self, TemplateError> {
        let root = document.document_element().ok_or_else(|| {
            TemplateError::new(ErrorKind::Config, "Template has no root element")
        })?;
        Ok(TemplateProcessor {
            context: Context::new(root.clone(), url),
            document,
            root,
            options: ProcessorOptions::default(),
            loader: DocumentLoader::default(),
        })
    }

    /// Parses template source text. Relative includes need a base URL, so a
    /// template parsed this way can only include absolute hrefs.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let document = Document::parse(source).map_err(|e| {
            TemplateError::new(ErrorKind::Config, format!("Template parse error: {}", e)).with_source(e)
        })?;
        Self::new(document, None)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let absolute = std::fs::canonicalize(path).map_err(|e| {
            TemplateError::new(
                ErrorKind::Include,
                format!("Template not found - {}", path.display()),
            )
            .with_source(e)
        })?;
        let url = Url::from_file_path(&absolute).map_err(|_| {
            TemplateError::new(
                ErrorKind::Include,
                format!("Template path not usable as URL - {}", absolute.display()),
            )
        })?;
        Self::from_url(&url, DocumentLoader::default())
    }

    /// Loads the template through `loader`, which is then also used for includes.
    pub fn from_url(url: &Url, loader: DocumentLoader) -> Result<Self, TemplateError> {
        let document = loader
            .load(url)
            .map_err(|e| TemplateError::new(ErrorKind::Include, e.to_string()).with_source(e))?;
        Ok(Self::new(document, Some(url.clone()))?.with_loader(loader))
    }

    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Shares a document cache with other processors, keeping the current source.
    pub fn with_cache(mut self, cache: Arc<DocumentCache>) -> Self {
        self.loader = DocumentLoader::with_cache(Arc::clone(self.loader.source()), cache);
        self
    }

    pub fn with_options(mut self, options: ProcessorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn url(&self) -> Option<&Url> {
        self.context.base_url()
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TemplateError> {
        self.context
            .set_variable(name, value.into())
            .map_err(|e| TemplateError::new(ErrorKind::Config, e.to_string()).with_source(e))
    }

    pub fn set_constant(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TemplateError> {
        self.context
            .set_constant(name, value.into())
            .map_err(|e| TemplateError::new(ErrorKind::Config, e.to_string()).with_source(e))
    }

    pub fn set_variables<I, K, V>(&mut self, variables: I) -> Result<(), TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in variables {
            self.set_variable(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Registers a function library for expressions such as `fn:length(x)`,
    /// where `fn` is declared in the template as a prefix for `uri`.
    pub fn add_namespace(&mut self, uri: &str, library: Arc<dyn FunctionLibrary>) {
        self.context.add_namespace(uri, library);
    }

    pub fn namespace(&self) -> &str {
        &self.options.namespace
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.options.namespace = namespace.into();
    }

    pub fn whitespace(&self) -> Whitespace {
        self.options.whitespace
    }

    pub fn set_whitespace(&mut self, whitespace: Whitespace) {
        self.options.whitespace = whitespace;
    }

    pub fn prefix_xml(&self) -> bool {
        self.options.prefix_xml
    }

    pub fn set_prefix_xml(&mut self, prefix_xml: bool) {
        self.options.prefix_xml = prefix_xml;
    }

    pub fn output(&self) -> OutputFormat {
        self.options.output
    }

    pub fn set_output(&mut self, output: OutputFormat) {
        self.options.output = output;
    }

    /// Processes the template, choosing XML or HTML output from the options as
    /// overridden by attributes on the template root.
    pub fn process<W: Write>(&self, out: W) -> Result<(), TemplateError> {
        let mut executor = self.executor();
        let options = self.resolve_options(&executor)?;
        log::debug!(
            "Processing template as {} (whitespace {})",
            options.output,
            options.whitespace
        );
        match options.output {
            OutputFormat::Xml => {
                let mut writer = XmlWriter::new(out)
                    .with_whitespace(options.whitespace)
                    .with_declaration(options.prefix_xml);
                self.run(&mut executor, &mut writer)
            }
            OutputFormat::Html => {
                let mut writer = HtmlWriter::new(out).with_whitespace(options.whitespace);
                self.run(&mut executor, &mut writer)
            }
        }
    }

    /// Processes to XML using the configured options only.
    pub fn process_xml<W: Write>(&self, out: W) -> Result<(), TemplateError> {
        let mut writer = XmlWriter::new(out)
            .with_whitespace(self.options.whitespace)
            .with_declaration(self.options.prefix_xml);
        self.run(&mut self.executor(), &mut writer)
    }

    /// Processes to HTML using the configured options only.
    pub fn process_html<W: Write>(&self, out: W) -> Result<(), TemplateError> {
        let mut writer = HtmlWriter::new(out).with_whitespace(self.options.whitespace);
        self.run(&mut self.executor(), &mut writer)
    }

    pub fn process_to_sink(&self, sink: &mut dyn OutputSink) -> Result<(), TemplateError> {
        self.run(&mut self.executor(), sink)
    }

    pub fn render_to_string(&self) -> Result<String, TemplateError> {
        let mut buffer = Vec::new();
        self.process(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            TemplateError::new(ErrorKind::Output, "Output is not valid UTF-8").with_source(e)
        })
    }

    fn executor(&self) -> TemplateExecutor {
        TemplateExecutor::new(
            self.context.clone(),
            self.options.namespace.clone(),
            self.loader.clone(),
        )
    }

    fn run(
        &self,
        executor: &mut TemplateExecutor,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        sink.start_document()?;
        executor.execute(&self.root, sink)?;
        sink.end_document()?;
        Ok(())
    }

    /// Applies `whitespace`, `output` and `prefix` from a `<template>` root, or
    /// the reserved-namespace `output` and `prefix` from a literal root.
    fn resolve_options(&self, executor: &TemplateExecutor) -> Result<ProcessorOptions, TemplateError> {
        let root = &self.root;
        let template_root = executor.directive(root) == Directive::Template;
        let option = |local: &str| -> Result<Option<(String, String)>, TemplateError> {
            let name = if template_root {
                Some(local.to_string())
            } else {
                root.attribute_ns(&self.options.namespace, local)
                    .map(|a| a.name.clone())
            };
            match name {
                Some(name) => Ok(executor
                    .substituted_attribute(root, &name)?
                    .map(|value| (name, value))),
                None => Ok(None),
            }
        };

        let mut options = self.options.clone();
        if template_root && let Some((name, value)) = option("whitespace")? {
            options.whitespace = value.parse().map_err(|_| {
                TemplateError::config(root, format!("Illegal whitespace option - {}", value))
                    .with_attribute(name.as_str())
            })?;
        }
        if let Some((name, value)) = option("output")? {
            options.output = value.parse().map_err(|e: ParseOutputFormatError| {
                TemplateError::config(root, e.to_string()).with_attribute(name.as_str())
            })?;
            if options.output == OutputFormat::Xml
                && let Some((name, value)) = option("prefix")?
            {
                options.prefix_xml = parse_prefix_option(&value).ok_or_else(|| {
                    TemplateError::config(root, format!("Illegal prefix option - {}", value))
                        .with_attribute(name.as_str())
                })?;
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::InMemorySource;

    const XT: &str = DEFAULT_NAMESPACE;

    fn processor(source: &str) -> TemplateProcessor {
        TemplateProcessor::parse(source).unwrap()
    }

    #[test]
    fn test_render_with_variable() {
        let mut p = processor(&format!(
            r#"<xt:template xmlns:xt="{XT}"><p class="${{cls}}">${{greeting}}</p></xt:template>"#
        ));
        p.set_variable("greeting", "hello").unwrap();
        p.set_variable("cls", "big").unwrap();
        assert_eq!(p.render_to_string().unwrap(), r#"<p class="big">hello</p>"#);
    }

    #[test]
    fn test_template_root_options() {
        let p = processor(&format!(
            r#"<xt:template xmlns:xt="{XT}" output="xml" prefix="yes"><a/></xt:template>"#
        ));
        assert_eq!(
            p.render_to_string().unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a/>"
        );
        assert!(!p.prefix_xml());
    }

    #[test]
    fn test_literal_root_reserved_options() {
        let p = processor(&format!(
            r#"<html xmlns:xt="{XT}" xt:output="html"><body><br/></body></html>"#
        ));
        assert_eq!(p.render_to_string().unwrap(), "<html><body><br></body></html>");
    }

    #[test]
    fn test_illegal_options() {
        let p = processor(&format!(
            r#"<xt:template xmlns:xt="{XT}" output="pdf"/>"#
        ));
        let err = p.render_to_string().unwrap_err();
        assert_eq!(err.message(), "Illegal output: pdf");
        assert_eq!(err.path().as_deref(), Some("/ xt:template / @output"));

        let p = processor(&format!(
            r#"<xt:template xmlns:xt="{XT}" whitespace="some"/>"#
        ));
        assert_eq!(
            p.render_to_string().unwrap_err().message(),
            "Illegal whitespace option - some"
        );

        let p = processor(&format!(
            r#"<xt:template xmlns:xt="{XT}" output="xml" prefix="maybe"/>"#
        ));
        assert_eq!(
            p.render_to_string().unwrap_err().message(),
            "Illegal prefix option - maybe"
        );
    }

    #[test]
    fn test_constant_cannot_be_reassigned() {
        let mut p = processor("<a/>");
        p.set_constant("limit", 10).unwrap();
        let err = p.set_variable("limit", 11).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_from_url_uses_loader() {
        let source = Arc::new(InMemorySource::new());
        source
            .add("mem://t/main.xml", format!(r#"<xt:template xmlns:xt="{XT}"><xt:include href="part.xml"/></xt:template>"#))
            .unwrap();
        source.add("mem://t/part.xml", "<part/>").unwrap();
        let loader = DocumentLoader::new(source);
        let url = Url::parse("mem://t/main.xml").unwrap();
        let p = TemplateProcessor::from_url(&url, loader).unwrap();
        assert_eq!(p.url().map(Url::as_str), Some("mem://t/main.xml"));
        assert_eq!(p.render_to_string().unwrap(), "<part/>");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!("text".parse::<OutputFormat>().is_err());
    }
}
