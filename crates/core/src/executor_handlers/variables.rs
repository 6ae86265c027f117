//! `<set>`: variable binding in the current scope.

use crate::error::TemplateError;
use crate::executor::TemplateExecutor;
use xtemplate_dom::NodeRef;

impl TemplateExecutor {
    pub(crate) fn handle_set(&mut self, element: &NodeRef) -> Result<(), TemplateError> {
        let name = self.required_identifier(element, "name")?;
        if element.attribute("document").is_some_and(|d| !d.is_empty()) {
            return Err(TemplateError::config(element, "Can't handle <set document= >")
                .with_attribute("document"));
        }
        if !element.is_content_empty() {
            return Err(TemplateError::config(element, "Illegal content"));
        }
        let value = self.evaluate_required(element, "value", "Value missing")?;
        log::debug!("<set> {} = {}", name, value);
        self.bind_variable(element, &name, value)
    }
}
