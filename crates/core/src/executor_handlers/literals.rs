//! Literal (non-directive) element output.

use crate::error::TemplateError;
use crate::executor::TemplateExecutor;
use xtemplate_dom::{Attribute, Element, NodeRef};
use xtemplate_expr::substitute;
use xtemplate_writer::{ElementName, OutputAttribute, OutputSink};

pub(crate) fn output_name(element: &Element) -> ElementName {
    ElementName::new(
        element.namespace.as_deref(),
        &element.local_name,
        &element.tag_name,
    )
}

pub(crate) fn output_attribute(attr: &Attribute, value: String) -> OutputAttribute {
    OutputAttribute {
        namespace: attr.namespace.clone(),
        local_name: attr.local_name.clone(),
        qualified_name: attr.name.clone(),
        value,
    }
}

impl TemplateExecutor {
    /// Emits the element with substituted attributes and processes its contents
    /// in the current scope. Reserved-namespace attributes, declarations of the
    /// reserved namespace and attributes that substitute to nothing are dropped.
    pub(crate) fn handle_literal_element(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let Some(e) = element.as_element() else {
            return Ok(());
        };
        let mut attributes = Vec::with_capacity(e.attributes.len());
        for attr in &e.attributes {
            if self.is_reserved(attr) {
                continue;
            }
            let value = substitute(&attr.value, &self.scopes).map_err(|err| {
                TemplateError::expression(
                    element,
                    &format!("Error in expression substitution - {}", attr.value),
                    err,
                )
                .with_attribute(attr.name.as_str())
            })?;
            if !value.is_empty() {
                attributes.push(output_attribute(attr, value.into_owned()));
            }
        }
        let name = output_name(e);
        sink.start_element(&name, &attributes)?;
        self.process_contents(element, false, sink)?;
        sink.end_element(&name)?;
        Ok(())
    }

    pub(crate) fn is_reserved(&self, attr: &Attribute) -> bool {
        if attr.is_namespace_declaration() {
            attr.value == self.namespace
        } else {
            attr.namespace.as_deref() == Some(self.namespace.as_str())
        }
    }
}
