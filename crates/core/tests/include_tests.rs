mod common;

use common::TestResult;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use url::Url;
use xtemplate_core::{
    DEFAULT_NAMESPACE, DocumentCache, DocumentLoader, ErrorKind, HttpSource, InMemorySource,
    TemplateError, TemplateProcessor, UrlSource,
};

fn xt(body: &str) -> String {
    common::template(body)
}

fn site(pages: &[(&str, String)]) -> Result<DocumentLoader, TemplateError> {
    common::init_logging();
    let source = Arc::new(InMemorySource::new());
    for (url, content) in pages {
        source
            .add(url, content.clone())
            .map_err(|e| TemplateError::new(ErrorKind::Include, e.to_string()))?;
    }
    Ok(DocumentLoader::new(source))
}

fn render_page(loader: DocumentLoader, url: &str) -> Result<String, Box<dyn std::error::Error>> {
    let p = TemplateProcessor::from_url(&Url::parse(url)?, loader)?;
    Ok(p.render_to_string()?)
}

// ============================================================================
// Relative resolution
// ============================================================================

#[test]
fn test_nested_includes_resolve_against_their_own_url() -> TestResult {
    let loader = site(&[
        (
            "mem://site/pages/main.xml",
            xt(r#"<page><xt:include href="../parts/header.xml"/></page>"#),
        ),
        (
            "mem://site/parts/header.xml",
            xt(r#"<header><xt:include href="logo.xml"/></header>"#),
        ),
        ("mem://site/parts/logo.xml", "<img src=\"logo.png\"/>".to_string()),
    ])?;
    assert_eq!(
        render_page(loader, "mem://site/pages/main.xml")?,
        r#"<page><header><img src="logo.png"/></header></page>"#
    );
    Ok(())
}

#[test]
fn test_included_template_sees_caller_bindings() -> TestResult {
    let loader = site(&[
        (
            "mem://t/main.xml",
            xt(r#"<xt:set name="title" value="'Home'"/><xt:macro name="shout">${text}!</xt:macro><xt:include href="part.xml"/>"#),
        ),
        (
            "mem://t/part.xml",
            xt(r#"<h1>${title}</h1><xt:call name="shout"><xt:param name="text" value="title"/></xt:call>"#),
        ),
    ])?;
    assert_eq!(render_page(loader, "mem://t/main.xml")?, "<h1>Home</h1>Home!");
    Ok(())
}

#[test]
fn test_include_bindings_do_not_leak() -> TestResult {
    let loader = site(&[
        (
            "mem://t/main.xml",
            xt(r#"<xt:include href="part.xml"/>${inner}"#),
        ),
        ("mem://t/part.xml", xt(r#"<xt:set name="inner" value="1"/>"#)),
    ])?;
    let err = render_page(loader, "mem://t/main.xml").unwrap_err();
    let err = err.downcast_ref::<TemplateError>().ok_or("not a template error")?;
    assert_eq!(err.kind(), ErrorKind::Expression);
    Ok(())
}

#[test]
fn test_include_href_is_substituted() -> TestResult {
    let loader = site(&[
        ("mem://t/main.xml", xt(r#"<xt:include href="${name}.xml"/>"#)),
        ("mem://t/footer.xml", "<footer/>".to_string()),
    ])?;
    let mut p = TemplateProcessor::from_url(&Url::parse("mem://t/main.xml")?, loader)?;
    p.set_variable("name", "footer")?;
    assert_eq!(p.render_to_string()?, "<footer/>");
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_include() -> TestResult {
    let loader = site(&[("mem://t/main.xml", xt(r#"<xt:include href="gone.xml"/>"#))])?;
    let p = TemplateProcessor::from_url(&Url::parse("mem://t/main.xml")?, loader)?;
    let err = p.render_to_string().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Include);
    assert_eq!(err.message(), "Document not found - mem://t/gone.xml");
    assert_eq!(err.attribute(), Some("href"));
    Ok(())
}

#[test]
fn test_include_without_href() -> TestResult {
    let err = common::render_error("<xt:include/>");
    assert_eq!(err.message(), "HRef missing");
    Ok(())
}

#[test]
fn test_unparseable_include() -> TestResult {
    let loader = site(&[
        ("mem://t/main.xml", xt(r#"<xt:include href="bad.xml"/>"#)),
        ("mem://t/bad.xml", "<open>".to_string()),
    ])?;
    let p = TemplateProcessor::from_url(&Url::parse("mem://t/main.xml")?, loader)?;
    let err = p.render_to_string().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Include);
    assert!(
        err.message().starts_with("Parsing error reading URL - mem://t/bad.xml"),
        "{}",
        err.message()
    );
    Ok(())
}

#[test]
fn test_recursive_include_is_stopped() -> TestResult {
    let loader = site(&[("mem://t/loop.xml", xt(r#"<xt:include href="loop.xml"/>"#))])?;
    let p = TemplateProcessor::from_url(&Url::parse("mem://t/loop.xml")?, loader)?;
    let err = p.render_to_string().unwrap_err();
    assert_eq!(err.message(), "Includes nested too deeply - loop.xml");
    Ok(())
}

// ============================================================================
// Caching and files
// ============================================================================

#[test]
fn test_shared_cache_loads_once() -> TestResult {
    common::init_logging();
    let source = Arc::new(InMemorySource::new());
    source.add("mem://t/main.xml", xt(r#"<xt:include href="part.xml"/>"#))?;
    source.add("mem://t/part.xml", "<part/>")?;
    let cache = Arc::new(DocumentCache::new());
    let loader = DocumentLoader::with_cache(source, cache.clone());

    let main = Url::parse("mem://t/main.xml")?;
    let first = TemplateProcessor::from_url(&main, loader.clone())?;
    let second = TemplateProcessor::from_url(&main, loader)?;
    assert_eq!(first.render_to_string()?, "<part/>");
    assert_eq!(second.render_to_string()?, "<part/>");
    assert_eq!(cache.len(), 2);
    assert!(Arc::ptr_eq(first.document(), second.document()));
    Ok(())
}

#[test]
fn test_include_from_files() -> TestResult {
    common::init_logging();
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("parts"))?;
    fs::write(
        dir.path().join("main.xml"),
        format!(
            r#"<xt:template xmlns:xt="{}"><body><xt:include href="parts/nav.xml"/></body></xt:template>"#,
            DEFAULT_NAMESPACE
        ),
    )?;
    fs::write(
        dir.path().join("parts/nav.xml"),
        format!(
            r#"<nav xmlns:xt="{}"><a xt:if="true" href="../index.html">home</a></nav>"#,
            DEFAULT_NAMESPACE
        ),
    )?;

    let p = TemplateProcessor::from_file(dir.path().join("main.xml"))?;
    assert_eq!(
        p.render_to_string()?,
        r#"<body><nav><a href="../index.html">home</a></nav></body>"#
    );
    Ok(())
}

// ============================================================================
// HTTP
// ============================================================================

/// Answers a single request on a local port with `status` and `body`.
fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: &'static [u8],
) -> std::io::Result<(String, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?;
    let handle = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buffer[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(body);
    });
    Ok((format!("http://{}/part.xml", address), handle))
}

fn http_loader() -> Result<DocumentLoader, Box<dyn std::error::Error>> {
    let client = reqwest::blocking::Client::builder().no_proxy().build()?;
    let source = UrlSource::new().with_scheme("http", Arc::new(HttpSource::with_client(client)));
    Ok(DocumentLoader::new(Arc::new(source)))
}

#[test]
fn test_include_over_http_uses_response_charset() -> TestResult {
    common::init_logging();
    let (url, server) = serve_once(
        "200 OK",
        "text/xml; charset=ISO-8859-1",
        b"<p>caf\xe9</p>",
    )?;
    let p = TemplateProcessor::parse(&xt(&format!(r#"<xt:include href="{}"/>"#, url)))?
        .with_loader(http_loader()?);
    assert_eq!(p.render_to_string()?, "<p>caf\u{e9}</p>");
    server.join().map_err(|_| "server thread panicked")?;
    Ok(())
}

#[test]
fn test_include_over_http_not_found() -> TestResult {
    common::init_logging();
    let (url, server) = serve_once("404 Not Found", "text/plain", b"missing")?;
    let p = TemplateProcessor::parse(&xt(&format!(r#"<xt:include href="{}"/>"#, url)))?
        .with_loader(http_loader()?);
    let err = p.render_to_string().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Include);
    assert_eq!(err.message(), format!("Document not found - {}", url));
    server.join().map_err(|_| "server thread panicked")?;
    Ok(())
}
