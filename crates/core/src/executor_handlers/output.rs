//! `<doctype>`: document type declaration output.

use crate::error::TemplateError;
use crate::executor::TemplateExecutor;
use xtemplate_dom::NodeRef;
use xtemplate_writer::OutputSink;

impl TemplateExecutor {
    pub(crate) fn handle_doctype(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let Some(name) = self.substituted_attribute(element, "name")? else {
            return Err(TemplateError::config(element, "Name missing").with_attribute("name"));
        };
        let system = self.substituted_attribute(element, "system")?;
        let public = self.substituted_attribute(element, "public")?;
        sink.start_dtd(&name, public.as_deref(), system.as_deref())?;
        sink.end_dtd()?;
        Ok(())
    }
}
