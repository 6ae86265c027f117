//! Directive interpretation.
//!
//! [`TemplateExecutor`] walks template elements depth first, applying the
//! `if` guard to every element before dispatching it to a directive handler
//! or to literal output.
//!
//! # Scopes
//!
//! The executor owns a [`ScopeStack`]. Handlers that need a child scope call
//! `enter_scope`, which pushes a scope and returns a guard that pops it when
//! dropped, so the stack is restored on every exit path including `?` returns.
//!
//! # Contents
//!
//! A contents list is processed in two passes: macro definitions among the
//! direct children are registered first, then every other child is processed
//! in document order. Directive bodies trim leading whitespace from their
//! first text item and trailing whitespace from their last.

use crate::context::{Context, ScopeStack};
use crate::directive::Directive;
use crate::error::TemplateError;
use crate::resolver::DocumentLoader;
use std::ops::{Deref, DerefMut};
use xtemplate_dom::{NodeKind, NodeRef};
use xtemplate_expr::{Expression, Value, is_valid_identifier, substitute};
use xtemplate_writer::OutputSink;

/// Interpreter state for one processing run.
#[derive(Debug)]
pub struct TemplateExecutor {
    pub(crate) scopes: ScopeStack,
    pub(crate) namespace: String,
    pub(crate) loader: DocumentLoader,
    /// Open `<include>`s and `<call>`s on the current path.
    pub(crate) nesting_depth: usize,
}

/// Includes and macro calls nested deeper than this are rejected, which also
/// stops include cycles and runaway recursion before the stack overflows.
pub(crate) const MAX_NESTING_DEPTH: usize = 100;

/// Pops the scope pushed by [`TemplateExecutor::enter_scope`] when dropped.
pub(crate) struct ScopeGuard<'e> {
    executor: &'e mut TemplateExecutor,
}

impl Deref for ScopeGuard<'_> {
    type Target = TemplateExecutor;

    fn deref(&self) -> &TemplateExecutor {
        self.executor
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut TemplateExecutor {
        self.executor
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.executor.scopes.pop();
    }
}

impl TemplateExecutor {
    pub fn new(root: Context, namespace: impl Into<String>, loader: DocumentLoader) -> Self {
        TemplateExecutor {
            scopes: ScopeStack::new(root),
            namespace: namespace.into(),
            loader,
            nesting_depth: 0,
        }
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Processes a template root: the contents of a `<template>` element, or
    /// any other element as a single directive or literal.
    pub fn execute(&mut self, root: &NodeRef, sink: &mut dyn OutputSink) -> Result<(), TemplateError> {
        if self.directive(root) == Directive::Template {
            self.process_contents(root, false, sink)
        } else {
            self.process_element(root, sink)
        }
    }

    pub(crate) fn directive(&self, element: &NodeRef) -> Directive {
        Directive::classify(element, &self.namespace)
    }

    pub(crate) fn enter_scope(&mut self, anchor: &NodeRef) -> ScopeGuard<'_> {
        self.scopes.push(anchor.clone());
        ScopeGuard { executor: self }
    }

    pub(crate) fn process_element(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        if !self.is_included(element)? {
            return Ok(());
        }
        let directive = self.directive(element);
        log::trace!("Processing {} at {}", directive.tag(), element.location());
        match directive {
            Directive::Error => self.handle_error(element),
            Directive::Doctype => self.handle_doctype(element, sink),
            Directive::Include => self.handle_include(element, sink),
            Directive::Set => self.handle_set(element),
            Directive::If => self.handle_if(element, sink),
            Directive::Switch => self.handle_switch(element, sink),
            Directive::For => self.handle_for(element, sink),
            Directive::Call => self.handle_call(element, sink),
            Directive::Comment => Ok(()),
            Directive::Copy => self.handle_copy(element, sink),
            Directive::Literal => self.handle_literal_element(element, sink),
            Directive::Macro => {
                log::warn!(
                    "<macro> outside a contents list ignored at {}",
                    element.location()
                );
                Ok(())
            }
            Directive::Template | Directive::Case | Directive::Param | Directive::Intercept => Err(
                TemplateError::config(element, format!("Misplaced {}", directive.tag())),
            ),
        }
    }

    /// Evaluates the reserved-namespace `if` attribute. An absent or empty guard includes the element.
    pub(crate) fn is_included(&self, element: &NodeRef) -> Result<bool, TemplateError> {
        let Some(guard) = element.attribute_ns(&self.namespace, "if") else {
            return Ok(true);
        };
        substitute(&guard.value, &self.scopes)
            .and_then(|test| {
                if test.is_empty() {
                    Ok(true)
                } else {
                    Expression::parse(&test)?
                        .evaluate(&self.scopes)?
                        .as_boolean()
                }
            })
            .map_err(|e| {
                TemplateError::expression(
                    element,
                    &format!("Error in \"if\" attribute - {}", guard.value),
                    e,
                )
                .with_attribute(guard.name.as_str())
            })
    }

    /// Value of an unprefixed attribute after `${}` substitution; `None` when absent or empty.
    pub(crate) fn substituted_attribute(
        &self,
        element: &NodeRef,
        name: &str,
    ) -> Result<Option<String>, TemplateError> {
        let Some(raw) = element.attribute(name) else {
            return Ok(None);
        };
        let value = substitute(raw, &self.scopes).map_err(|e| {
            TemplateError::expression(element, "Error in expression substitution", e)
                .with_attribute(name)
        })?;
        Ok(if value.is_empty() {
            None
        } else {
            Some(value.into_owned())
        })
    }

    /// Like `substituted_attribute`, for attributes that must name a variable.
    pub(crate) fn identifier_attribute(
        &self,
        element: &NodeRef,
        name: &str,
        message: &str,
    ) -> Result<Option<String>, TemplateError> {
        match self.substituted_attribute(element, name)? {
            Some(ident) if !is_valid_identifier(&ident) => {
                Err(TemplateError::config(element, message).with_attribute(name))
            }
            ident => Ok(ident),
        }
    }

    pub(crate) fn required_identifier(
        &self,
        element: &NodeRef,
        name: &str,
    ) -> Result<String, TemplateError> {
        self.substituted_attribute(element, name)?
            .filter(|ident| is_valid_identifier(ident))
            .ok_or_else(|| {
                TemplateError::config(element, "Name missing or invalid").with_attribute(name)
            })
    }

    /// Evaluates a mandatory expression attribute.
    pub(crate) fn evaluate_required(
        &self,
        element: &NodeRef,
        name: &str,
        missing: &str,
    ) -> Result<Value, TemplateError> {
        let Some(text) = self.substituted_attribute(element, name)? else {
            return Err(TemplateError::config(element, missing).with_attribute(name));
        };
        self.evaluate(element, name, &text)
    }

    pub(crate) fn bind_variable(
        &mut self,
        element: &NodeRef,
        name: &str,
        value: Value,
    ) -> Result<(), TemplateError> {
        self.scopes
            .set_variable(name, value)
            .map_err(|e| TemplateError::scope(element, e))
    }

    /// Parses and evaluates `text`, the substituted value of attribute `name`.
    pub(crate) fn evaluate(
        &self,
        element: &NodeRef,
        name: &str,
        text: &str,
    ) -> Result<Value, TemplateError> {
        Expression::parse(text)
            .and_then(|expr| expr.evaluate(&self.scopes))
            .map_err(|e| {
                TemplateError::expression(element, &format!("Error in {} - {}", name, text), e)
                    .with_attribute(name)
            })
    }

    pub(crate) fn process_contents(
        &mut self,
        element: &NodeRef,
        trim: bool,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let children: Vec<NodeRef> = element.children().collect();
        let items = if trim {
            trimmed(&children)
        } else {
            &children[..]
        };
        for child in items {
            if self.directive(child) == Directive::Macro {
                self.register_macro(child)?;
            }
        }
        let last = items.len().saturating_sub(1);
        for (i, child) in items.iter().enumerate() {
            match child.kind() {
                NodeKind::Element(_) => {
                    if self.directive(child) != Directive::Macro {
                        self.process_element(child, sink)?;
                    }
                }
                NodeKind::Text(text) => {
                    let mut data = text.as_str();
                    if trim && i == 0 {
                        data = data.trim_start();
                    }
                    if trim && i == last {
                        data = data.trim_end();
                    }
                    self.output_text(child, data, sink)?;
                }
                NodeKind::CData(data) => {
                    sink.start_cdata()?;
                    sink.characters(data)?;
                    sink.end_cdata()?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn process_contents_in_new_scope(
        &mut self,
        element: &NodeRef,
        trim: bool,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let mut scope = self.enter_scope(element);
        scope.process_contents(element, trim, sink)
    }

    fn register_macro(&mut self, element: &NodeRef) -> Result<(), TemplateError> {
        let name = element.attribute("name").unwrap_or_default();
        if !is_valid_identifier(name) {
            return Err(
                TemplateError::config(element, "Macro name missing or invalid").with_attribute("name"),
            );
        }
        log::debug!("Registering macro '{}'", name);
        self.scopes
            .register_macro(name, element.clone())
            .map_err(|e| TemplateError::scope(element, e))
    }

    fn output_text(
        &self,
        node: &NodeRef,
        data: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        if data.is_empty() {
            return Ok(());
        }
        let text = substitute(data, &self.scopes).map_err(|e| {
            TemplateError::expression(node, "Error in expression substitution", e)
        })?;
        sink.characters(&text)?;
        Ok(())
    }
}

/// Drops leading and trailing comments and whitespace-only nodes.
fn trimmed(children: &[NodeRef]) -> &[NodeRef] {
    let start = children
        .iter()
        .position(|c| !c.is_comment_or_whitespace())
        .unwrap_or(children.len());
    let end = children
        .iter()
        .rposition(|c| !c.is_comment_or_whitespace())
        .map_or(start, |i| i + 1);
    &children[start..end]
}
