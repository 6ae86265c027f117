//! `<copy>`/`<intercept>`: verbatim copy of a document fragment with tag-based replacement.
//!
//! Copied attributes and text are written as found; no `${}` substitution is
//! applied to the copied fragment. Only intercept replacements are processed
//! as template content.

use crate::directive::Directive;
use crate::error::TemplateError;
use crate::executor::TemplateExecutor;
use crate::executor_handlers::literals::{output_attribute, output_name};
use xtemplate_dom::{NodeKind, NodeRef};
use xtemplate_expr::Value;
use xtemplate_writer::OutputSink;

/// Replacement for copied elements with a given tag name, valid for one `<copy>`.
#[derive(Debug, Clone)]
pub(crate) struct Intercept {
    tag_name: String,
    replacement: NodeRef,
    capture: Option<String>,
}

impl TemplateExecutor {
    pub(crate) fn handle_copy(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let Some(target) = self.substituted_attribute(element, "element")? else {
            return Err(TemplateError::config(element, "<copy> element missing").with_attribute("element"));
        };
        let mut scope = self.enter_scope(element);
        let source = match scope.evaluate(element, "element", &target)? {
            Value::Element(node) if node.is_element() => node,
            _ => {
                return Err(TemplateError::type_error(element, "<copy> must specify element")
                    .with_attribute("element"));
            }
        };
        let include = match scope.substituted_attribute(element, "option")?.as_deref() {
            None => false,
            Some("include") => true,
            Some(other) => {
                return Err(TemplateError::config(
                    element,
                    format!("<copy> option not recognised - {}", other),
                )
                .with_attribute("option"));
            }
        };
        let intercepts = scope.collect_intercepts(element)?;
        log::debug!(
            "Copying <{}> with {} intercept(s)",
            source.tag_name().unwrap_or_default(),
            intercepts.len()
        );
        if include {
            scope.copy_element(&source, &intercepts, sink)
        } else {
            scope.copy_contents(&source, &intercepts, sink)
        }
    }

    fn collect_intercepts(&self, element: &NodeRef) -> Result<Vec<Intercept>, TemplateError> {
        let mut intercepts = Vec::new();
        for child in element.children() {
            if !child.is_element() {
                if !child.is_comment_or_whitespace() {
                    return Err(TemplateError::config(element, "Illegal content within <copy>"));
                }
                continue;
            }
            if !self.is_included(&child)? {
                continue;
            }
            if self.directive(&child) != Directive::Intercept {
                return Err(TemplateError::config(&child, "Illegal element within <copy>"));
            }
            let Some(tag_name) = self.substituted_attribute(&child, "element")? else {
                return Err(TemplateError::config(&child, "<intercept> element missing")
                    .with_attribute("element"));
            };
            let capture = self.identifier_attribute(&child, "name", "Invalid name on <intercept>")?;
            intercepts.push(Intercept {
                tag_name,
                replacement: child.clone(),
                capture,
            });
        }
        Ok(intercepts)
    }

    fn copy_element(
        &mut self,
        node: &NodeRef,
        intercepts: &[Intercept],
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let Some(element) = node.as_element() else {
            return Ok(());
        };
        if let Some(intercept) = intercepts.iter().find(|i| i.tag_name == element.tag_name) {
            let replacement = &intercept.replacement;
            let mut scope = self.enter_scope(replacement);
            if let Some(capture) = &intercept.capture {
                scope.bind_variable(replacement, capture, Value::Element(node.clone()))?;
            }
            return scope.process_contents(replacement, true, sink);
        }
        let attributes: Vec<_> = element
            .attributes
            .iter()
            .filter(|attr| !self.is_reserved(attr))
            .map(|attr| output_attribute(attr, attr.value.clone()))
            .collect();
        let name = output_name(element);
        sink.start_element(&name, &attributes)?;
        self.copy_contents(node, intercepts, sink)?;
        sink.end_element(&name)?;
        Ok(())
    }

    fn copy_contents(
        &mut self,
        node: &NodeRef,
        intercepts: &[Intercept],
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let mut scope = self.enter_scope(node);
        for child in node.children() {
            match child.kind() {
                NodeKind::Element(_) => scope.copy_element(&child, intercepts, sink)?,
                NodeKind::CData(data) => {
                    sink.start_cdata()?;
                    sink.characters(data)?;
                    sink.end_cdata()?;
                }
                NodeKind::Text(data) => sink.characters(data)?,
                _ => {}
            }
        }
        Ok(())
    }
}
