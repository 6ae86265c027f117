//! Command line surface of the `xtemplate` binary.
//!
//! Every URL argument is resolved against the working directory, so plain
//! relative file paths work as well as absolute `file:` URLs.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use xtemplate_core::bindings::{parse_arg, parse_json, parse_properties};
use xtemplate_core::{
    DocumentLoader, JSTL_FUNCTIONS_NAMESPACE, LoadError, StringFunctions, TemplateError,
    TemplateProcessor, Value, is_valid_identifier, resolve_href,
};

#[derive(Parser, Debug)]
#[command(name = "xtemplate", version, about = "Process an XML template", long_about = None)]
pub struct Cli {
    /// Template URL or path
    #[arg(long, value_name = "URL")]
    pub template: String,

    /// Output file (default: standard output)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Bind the root element of an XML document to a variable
    #[arg(long, num_args = 2, value_names = ["NAME", "URL"])]
    pub xml: Vec<String>,

    /// Bind the contents of a JSON document to a variable
    #[arg(long, num_args = 2, value_names = ["NAME", "URL"])]
    pub json: Vec<String>,

    /// Bind a properties file to a variable as a map of strings
    #[arg(long, num_args = 2, value_names = ["NAME", "URL"])]
    pub prop: Vec<String>,

    /// Define a variable; without a value it is bound to true
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    pub define: Vec<String>,

    /// Don't register the standard string function library
    #[arg(long)]
    pub nojstl: bool,

    /// Log at debug level
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("JSON error reading URL - {url}: {source}")]
    Json {
        url: Url,
        source: serde_json::Error,
    },

    #[error("No root element in document - {0}")]
    NoRootElement(Url),

    #[error("Invalid variable name - {0}")]
    InvalidName(String),

    #[error("Current directory is not usable as a base URL")]
    WorkingDirectory,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Runs the command with URLs relative to the current directory.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let dir = std::env::current_dir()?;
    let base = Url::from_directory_path(&dir).map_err(|_| CliError::WorkingDirectory)?;
    execute(cli, &base)
}

/// Runs the command with URLs relative to `base`.
pub fn execute(cli: &Cli, base: &Url) -> Result<(), CliError> {
    let loader = DocumentLoader::default();
    let template_url = resolve_href(Some(base), &cli.template)?;
    log::debug!("Template {}", template_url);
    let mut processor = TemplateProcessor::from_url(&template_url, loader.clone())?;
    if !cli.nojstl {
        processor.add_namespace(JSTL_FUNCTIONS_NAMESPACE, Arc::new(StringFunctions));
    }

    for (name, href) in pairs(&cli.xml) {
        let url = resolve_href(Some(base), href)?;
        let document = loader.load(&url)?;
        let root = document
            .document_element()
            .ok_or(CliError::NoRootElement(url))?;
        bind(&mut processor, name, Value::from(root))?;
    }
    for (name, href) in pairs(&cli.json) {
        let url = resolve_href(Some(base), href)?;
        let text = loader.fetch_text(&url)?;
        let value = parse_json(&text).map_err(|source| CliError::Json { url, source })?;
        bind(&mut processor, name, value)?;
    }
    for (name, href) in pairs(&cli.prop) {
        let url = resolve_href(Some(base), href)?;
        let text = loader.fetch_text(&url)?;
        bind(&mut processor, name, parse_properties(&text))?;
    }
    for definition in &cli.define {
        let (name, value) = match definition.split_once('=') {
            Some((name, value)) => (name, parse_arg(value)),
            None => (definition.as_str(), Value::Bool(true)),
        };
        bind(&mut processor, name, value)?;
    }

    match &cli.out {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            processor.process(&mut out)?;
            out.flush()?;
        }
        None => {
            let mut out = io::stdout().lock();
            processor.process(&mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn pairs(values: &[String]) -> impl Iterator<Item = (&str, &str)> {
    values
        .chunks_exact(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
}

fn bind(processor: &mut TemplateProcessor, name: &str, value: Value) -> Result<(), CliError> {
    if !is_valid_identifier(name) {
        return Err(CliError::InvalidName(name.to_string()));
    }
    processor.set_variable(name, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "xtemplate",
            "--template",
            "page.xml",
            "--json",
            "data",
            "data.json",
            "--json",
            "more",
            "more.json",
            "-D",
            "debug",
            "-D",
            "count=3",
            "--nojstl",
        ])
        .unwrap();
        assert_eq!(cli.template, "page.xml");
        assert_eq!(
            pairs(&cli.json).collect::<Vec<_>>(),
            vec![("data", "data.json"), ("more", "more.json")]
        );
        assert_eq!(cli.define, vec!["debug", "count=3"]);
        assert!(cli.nojstl);
        assert!(!cli.verbose);
        assert!(cli.out.is_none());
    }

    #[test]
    fn test_template_is_required() {
        assert!(Cli::try_parse_from(["xtemplate", "--out", "x.xml"]).is_err());
    }

    #[test]
    fn test_xml_needs_name_and_url() {
        assert!(Cli::try_parse_from(["xtemplate", "--template", "t.xml", "--xml", "doc"]).is_err());
    }
}
