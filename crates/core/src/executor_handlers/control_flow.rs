//! Conditional and macro-call directives: `<if>`, `<switch>`/`<case>`, `<call>`/`<param>`.

use crate::directive::Directive;
use crate::error::TemplateError;
use crate::executor::{MAX_NESTING_DEPTH, TemplateExecutor};
use xtemplate_dom::NodeRef;
use xtemplate_writer::OutputSink;

impl TemplateExecutor {
    pub(crate) fn handle_if(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let Some(test) = self.substituted_attribute(element, "test")? else {
            return Err(TemplateError::config(element, "Test must be specified").with_attribute("test"));
        };
        if self.evaluate_test(element, &test)? {
            self.process_contents_in_new_scope(element, true, sink)?;
        }
        Ok(())
    }

    /// Processes the first included `<case>` whose test is absent or true.
    /// Children after the matching case are not examined.
    pub(crate) fn handle_switch(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        for child in element.children() {
            if !child.is_element() {
                if !child.is_comment_or_whitespace() {
                    return Err(TemplateError::config(element, "Illegal content within <switch>"));
                }
                continue;
            }
            if !self.is_included(&child)? {
                continue;
            }
            if self.directive(&child) != Directive::Case {
                return Err(TemplateError::config(&child, "Illegal element within <switch>"));
            }
            let matched = match self.substituted_attribute(&child, "test")? {
                Some(test) => self.evaluate_test(&child, &test)?,
                None => true,
            };
            if matched {
                return self.process_contents_in_new_scope(&child, true, sink);
            }
        }
        Ok(())
    }

    /// Binds `<param>` children in a new scope, then processes the macro body there.
    pub(crate) fn handle_call(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let name = self
            .substituted_attribute(element, "name")?
            .unwrap_or_default();
        let Some(body) = self.scopes.resolve_macro(&name).cloned() else {
            return Err(
                TemplateError::config(element, format!("macro name incorrect - {}", name))
                    .with_attribute("name"),
            );
        };
        if self.nesting_depth >= MAX_NESTING_DEPTH {
            return Err(TemplateError::config(
                element,
                format!("Macro calls nested too deeply - {}", name),
            )
            .with_attribute("name"));
        }
        let mut scope = self.enter_scope(element);
        for child in element.children() {
            if !child.is_element() {
                if !child.is_comment_or_whitespace() {
                    return Err(TemplateError::config(element, "Illegal content within <call>"));
                }
                continue;
            }
            if !scope.is_included(&child)? {
                continue;
            }
            if scope.directive(&child) != Directive::Param {
                return Err(TemplateError::config(&child, "Illegal element within <call>"));
            }
            scope.bind_param(&child)?;
        }
        log::debug!("Calling macro '{}' at depth {}", name, scope.nesting_depth);
        scope.nesting_depth += 1;
        let result = scope.process_contents(&body, true, sink);
        scope.nesting_depth -= 1;
        result
    }

    fn bind_param(&mut self, param: &NodeRef) -> Result<(), TemplateError> {
        let name = self.required_identifier(param, "name")?;
        let value = self.evaluate_required(param, "value", "Value missing")?;
        self.bind_variable(param, &name, value)
    }

    fn evaluate_test(&self, element: &NodeRef, test: &str) -> Result<bool, TemplateError> {
        self.evaluate(element, "test", test)?
            .as_boolean()
            .map_err(|e| {
                TemplateError::expression(element, &format!("Error in test - {}", test), e)
                    .with_attribute("test")
            })
    }
}
