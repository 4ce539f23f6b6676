//! Conversion from files and saving to the workspace cache

use folio_common::FolioError;
use folio_config::Config;
use folio_core::{document_key, DocumentSource, FolioEngine};
use folio_test_helpers::prelude::*;
use folio_test_helpers::workspace::temp_file;
use predicates::prelude::*;
use std::fs;

const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html><head><title>ignored</title><style>p { color: red }</style></head>
<body>
  <h1>Quarterly Report</h1>
  <h2>Summary</h2>
  <p>Revenue grew &amp; costs fell.</p>
  <ul><li>North<li>South</ul>
  <table>
    <caption>Regional totals</caption>
    <tr><th>Region</th><th>Total</th></tr>
    <tr><td>North</td><td>10</td></tr>
  </table>
</body></html>"#;

#[test]
fn test_convert_html_file() {
    let (_dir, path) = temp_file("report.html", REPORT_HTML.as_bytes());
    let engine = FolioEngine::new(&Config::with_root(path.parent().unwrap()));
    let origin = path.to_string_lossy().to_string();
    let key = document_key(origin.as_bytes());

    let source = DocumentSource::from_path(&path).unwrap();
    engine.convert_into(&key, &source, &origin).unwrap();

    let markdown = engine.export_markdown(&key).unwrap();
    assert!(markdown.starts_with("# Quarterly Report\n\n## Summary\n\nRevenue grew & costs fell."));
    assert!(markdown.contains("- North\n- South"));
    assert!(markdown.contains("Regional totals\n\n| Region | Total |\n|---|---|\n| North | 10 |"));
    assert!(!markdown.contains("ignored"));
    assert!(!markdown.contains("color"));

    let overview = engine.overview(&key).unwrap();
    assert!(overview.contains("table"));
    assert!(overview.contains("caption"));
}

#[test]
fn test_convert_deeply_nested_html_file() {
    suppress_logs();
    let nested = format!(
        "<html><body>{}<p>deep</p>{}</body></html>",
        "<div><ul><li>".repeat(20_000),
        "</li></ul></div>".repeat(20_000)
    );
    let (_dir, path) = temp_file("nested.html", nested.as_bytes());
    let engine = FolioEngine::new(&Config::with_root(path.parent().unwrap()));
    let origin = path.to_string_lossy().to_string();
    let key = document_key(origin.as_bytes());

    let source = DocumentSource::from_path(&path).unwrap();
    match engine.convert_into(&key, &source, &origin) {
        Ok(_) => assert!(engine.export_markdown(&key).unwrap().contains("deep")),
        Err(err) => assert!(matches!(
            err,
            FolioError::ConversionFailed(_) | FolioError::InvalidInput(_)
        )),
    }
}

#[test]
fn test_convert_missing_file_fails() {
    let dir = temp_dir();
    let missing = dir.path().join("nope.md");
    assert!(matches!(
        DocumentSource::from_path(&missing),
        Err(FolioError::ConversionFailed(_))
    ));
}

#[test]
fn test_save_to_configured_cache_dir() {
    let workspace = workspace_with_config("[storage]\nmarkdown_text_width = 20\n");
    let config = Config::load(workspace.path()).unwrap();
    let engine = FolioEngine::new(&config);

    let (key, _) = engine.create_document("save me").unwrap();
    engine.add_title(&key, "Saved").unwrap();
    engine
        .add_paragraph(&key, "A paragraph that is long enough to wrap at twenty columns")
        .unwrap();

    let paths = engine.save(&key, None).unwrap();
    assert_eq!(paths.markdown, workspace.path().join(".folio/cache").join(format!("{}.md", key)));

    let markdown = fs::read_to_string(&paths.markdown).unwrap();
    assert!(markdown.lines().all(|l| l.chars().count() <= 20));

    let json = fs::read_to_string(&paths.json).unwrap();
    assert!(predicate::str::contains("prompt: save me").eval(&json));
    assert_eq!(json, engine.export_json(&key).unwrap());
}

#[test]
fn test_save_to_explicit_directory_overwrites() {
    let workspace = init_workspace();
    let engine = FolioEngine::new(&Config::with_root(workspace.path()));
    let (key, _) = engine.create_document("overwrite").unwrap();
    let target = workspace.path().join("exports");

    engine.add_title(&key, "First").unwrap();
    engine.save(&key, Some(&target)).unwrap();
    engine.add_paragraph(&key, "Second").unwrap();
    let paths = engine.save(&key, Some(&target)).unwrap();

    assert_eq!(fs::read_to_string(&paths.markdown).unwrap(), "# First\n\nSecond\n");
}
