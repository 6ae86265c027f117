//! `<error>`: aborts processing with an explicit diagnostic.

use crate::error::TemplateError;
use crate::executor::TemplateExecutor;
use xtemplate_dom::NodeRef;

const DEFAULT_ERROR_TEXT: &str = "Error element";

impl TemplateExecutor {
    pub(crate) fn handle_error(&mut self, element: &NodeRef) -> Result<(), TemplateError> {
        let text = self.substituted_attribute(element, "text")?;
        let message = text.as_deref().unwrap_or(DEFAULT_ERROR_TEXT);
        log::debug!("<error> at {}: {}", element.location(), message);
        Err(TemplateError::explicit(element, message))
    }
}
