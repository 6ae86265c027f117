//! `<include>`: processing of another template document by URL.

use crate::error::TemplateError;
use crate::executor::{MAX_NESTING_DEPTH, TemplateExecutor};
use crate::resolver::resolve_href;
use xtemplate_dom::NodeRef;
use xtemplate_writer::OutputSink;

impl TemplateExecutor {
    /// Resolves `href` against the current base URL and processes the loaded
    /// document in a scope anchored at its root, with the base URL set to the
    /// resolved location.
    pub(crate) fn handle_include(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let Some(href) = self.substituted_attribute(element, "href")? else {
            return Err(TemplateError::config(element, "HRef missing").with_attribute("href"));
        };
        if self.nesting_depth >= MAX_NESTING_DEPTH {
            return Err(TemplateError::include(
                element,
                format!("Includes nested too deeply - {}", href),
            )
            .with_attribute("href"));
        }
        let url = resolve_href(self.scopes.base_url(), &href).map_err(|e| {
            TemplateError::include(element, format!("Error on include - {}", href))
                .with_attribute("href")
                .with_source(e)
        })?;
        log::debug!("Including {}", url);
        let document = self.loader.load(&url).map_err(|e| {
            TemplateError::include(element, e.to_string())
                .with_attribute("href")
                .with_source(e)
        })?;
        let Some(root) = document.document_element() else {
            return Err(TemplateError::include(
                element,
                format!("No root element in included document - {}", url),
            ));
        };

        let mut scope = self.enter_scope(&root);
        scope.scopes.current_mut().set_base_url(Some(url));
        scope.nesting_depth += 1;
        let result = scope.execute(&root, sink);
        scope.nesting_depth -= 1;
        result
    }
}
