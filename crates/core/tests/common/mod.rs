#![allow(dead_code)]

use xtemplate_core::{DEFAULT_NAMESPACE, TemplateError, TemplateProcessor};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wraps `body` in an `<xt:template>` root that declares the `xt` prefix.
pub fn template(body: &str) -> String {
    format!(
        r#"<xt:template xmlns:xt="{}">{}</xt:template>"#,
        DEFAULT_NAMESPACE, body
    )
}

pub fn processor(body: &str) -> Result<TemplateProcessor, TemplateError> {
    init_logging();
    TemplateProcessor::parse(&template(body))
}

pub fn render(body: &str) -> Result<String, TemplateError> {
    processor(body)?.render_to_string()
}

pub fn render_error(body: &str) -> TemplateError {
    match render(body) {
        Ok(output) => panic!("expected an error, got output {:?}", output),
        Err(e) => e,
    }
}
