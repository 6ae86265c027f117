mod common;

use common::TestResult;
use common::fixtures::Workspace;
use xtemplate::ErrorKind;
use xtemplate::cli::CliError;

// ============================================================================
// Variable sources
// ============================================================================

#[test]
fn test_defines() -> TestResult {
    let ws = Workspace::new()?;
    ws.write_template("page.xml", r#"<p>${flag} ${count + 1} ${name}</p>"#)?;
    let output = ws.run(&[
        "--template", "page.xml", "-D", "flag", "-D", "count=0x10", "-D", "name=Fred",
    ])?;
    assert_eq!(output, "<p>true 17 Fred</p>");
    Ok(())
}

#[test]
fn test_json_data() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("data/people.json", r#"{"people": [{"name": "Ann"}, {"name": "Bob"}]}"#)?;
    ws.write_template(
        "page.xml",
        r#"<ul><xt:for name="p" collection="data.people"><li>${p.name}</li></xt:for></ul>"#,
    )?;
    let output = ws.run(&["--template", "page.xml", "--json", "data", "data/people.json"])?;
    assert_eq!(output, "<ul><li>Ann</li><li>Bob</li></ul>");
    Ok(())
}

#[test]
fn test_xml_data_can_be_copied() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("rows.xml", r#"<rows><row n="1"/><row n="2"/></rows>"#)?;
    ws.write_template("page.xml", r#"<table><xt:copy element="rows"/></table>"#)?;
    let output = ws.run(&["--template", "page.xml", "--xml", "rows", "rows.xml"])?;
    assert_eq!(output, r#"<table><row n="1"/><row n="2"/></table>"#);
    Ok(())
}

#[test]
fn test_properties_data() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("labels.properties", "# labels\ntitle = Report\nfooter: Page end\n")?;
    ws.write_template("page.xml", r#"<h1>${labels.title}</h1><p>${labels.footer}</p>"#)?;
    let output = ws.run(&["--template", "page.xml", "--prop", "labels", "labels.properties"])?;
    assert_eq!(output, "<h1>Report</h1><p>Page end</p>");
    Ok(())
}

#[test]
fn test_invalid_variable_name() -> TestResult {
    let ws = Workspace::new()?;
    ws.write_template("page.xml", "<p/>")?;
    let err = ws.run(&["--template", "page.xml", "-D", "1st=x"]).unwrap_err();
    assert!(matches!(err, CliError::InvalidName(ref name) if name == "1st"));
    Ok(())
}

// ============================================================================
// Function library and includes
// ============================================================================

#[test]
fn test_string_functions_registered_by_default() -> TestResult {
    let ws = Workspace::new()?;
    ws.write_template("page.xml", r#"<p>${fn:length(name)}</p>"#)?;
    let output = ws.run(&["--template", "page.xml", "-D", "name=abcd"])?;
    assert_eq!(output, "<p>4</p>");

    let err = ws
        .run(&["--template", "page.xml", "-D", "name=abcd", "--nojstl"])
        .unwrap_err();
    assert!(matches!(err, CliError::Template(ref e) if e.kind() == ErrorKind::Expression));
    Ok(())
}

#[test]
fn test_includes_resolve_against_template() -> TestResult {
    let ws = Workspace::new()?;
    ws.write_template("site/page.xml", r#"<body><xt:include href="parts/nav.xml"/></body>"#)?;
    ws.write("site/parts/nav.xml", "<nav/>")?;
    let output = ws.run(&["--template", "site/page.xml"])?;
    assert_eq!(output, "<body><nav/></body>");
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_template_error_has_path() -> TestResult {
    let ws = Workspace::new()?;
    ws.write_template("page.xml", r#"<div id="main"><xt:error text="failed"/></div>"#)?;
    let err = ws.run(&["--template", "page.xml"]).unwrap_err();
    let CliError::Template(e) = err else {
        panic!("expected template error, got {:?}", err);
    };
    assert_eq!(e.message(), "failed");
    assert_eq!(e.path().as_deref(), Some("/ xt:template / div#main / xt:error"));
    Ok(())
}

#[test]
fn test_missing_template() -> TestResult {
    let ws = Workspace::new()?;
    let err = ws.run(&["--template", "absent.xml"]).unwrap_err();
    assert!(matches!(err, CliError::Template(ref e) if e.kind() == ErrorKind::Include));
    assert!(ws.path().read_dir()?.next().is_none());
    Ok(())
}

#[test]
fn test_invalid_json() -> TestResult {
    let ws = Workspace::new()?;
    ws.write_template("page.xml", "<p/>")?;
    ws.write("bad.json", "{ nope")?;
    let err = ws
        .run(&["--template", "page.xml", "--json", "data", "bad.json"])
        .unwrap_err();
    assert!(matches!(err, CliError::Json { .. }));
    assert!(err.to_string().starts_with("JSON error reading URL - file:"));
    Ok(())
}
