//! End-to-end runs of the command line: files in a temporary directory,
//! fonts from the synthetic back-end, the layout read back from disk.

use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Parser;
use quire_cli::{run_with, CliError, Options};
use quire_core::LayoutError;
use quire_layout::load_layout;
use quire_text::{FontCache, LayoutCommand, SyntheticBackend};
use tempfile::TempDir;

const DOCUMENT: &str = "<html><body><p>Hello world</p></body></html>";

/// Writes `doc.xhtml` and `style.css`; returns their paths and the output path.
fn inputs(dir: &TempDir, css: &str) -> (PathBuf, PathBuf, PathBuf) {
    let write = |name: &str, text: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    };
    (
        write("doc.xhtml", DOCUMENT),
        write("style.css", css),
        dir.path().join("layout.json"),
    )
}

fn options(document: &Path, style: &Path, output: &Path, extra: &[&str]) -> Options {
    let mut args = vec![
        "quire".to_string(),
        document.display().to_string(),
        style.display().to_string(),
        "--font".to_string(),
        "sans=box".to_string(),
        "--output".to_string(),
        output.display().to_string(),
    ];
    args.extend(extra.iter().map(|a| a.to_string()));
    Options::try_parse_from(args).unwrap()
}

fn glyph_text(commands: &[LayoutCommand]) -> String {
    commands
        .iter()
        .filter_map(|c| match c {
            LayoutCommand::Glyph { glyph, .. } => char::from_u32(*glyph),
            _ => None,
        })
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[test]
fn test_run_writes_layout() {
    let dir = tempfile::tempdir().unwrap();
    let css = r#"
        /* quoted family names may hold separators */
        p { font-family: "A;B", 'sans'; color: #336699 }
    "#;
    let (document, style, output) = inputs(&dir, css);
    let options = options(&document, &style, &output, &["--render", "256"]);

    run_with(&options, FontCache::shared(SyntheticBackend::new())).unwrap();

    let json = std::fs::read_to_string(&output).unwrap();
    let layout = load_layout(&json, &FontCache::new(SyntheticBackend::new())).unwrap();
    assert_eq!(glyph_text(layout.commands()), "Helloworld");
    assert!(layout.height() > 0);
    // One line at the default 16px size.
    let baselines: Vec<_> = layout
        .commands()
        .iter()
        .filter_map(|c| match c {
            LayoutCommand::Glyph { y, .. } => Some(*y),
            _ => None,
        })
        .collect();
    assert!(baselines.iter().all(|&y| y == baselines[0]));
}

#[test]
fn test_narrow_width_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let (document, style, output) = inputs(&dir, "p { font-family: sans }");
    // Six 8px glyphs per line: "Hello " fits, "Hello w" does not.
    let options = options(&document, &style, &output, &["--width", "48", "--no-hyphenate"]);

    run_with(&options, FontCache::shared(SyntheticBackend::new())).unwrap();

    let json = std::fs::read_to_string(&output).unwrap();
    let layout = load_layout(&json, &FontCache::new(SyntheticBackend::new())).unwrap();
    let mut baselines: Vec<_> = layout
        .commands()
        .iter()
        .filter_map(|c| match c {
            LayoutCommand::Glyph { y, .. } => Some(*y),
            _ => None,
        })
        .collect();
    baselines.dedup();
    assert_eq!(baselines.len(), 2);
}

#[test]
fn test_css_errors_surface() {
    let dir = tempfile::tempdir().unwrap();
    let (document, style, output) = inputs(&dir, "p { color: red }\np { margin: }");
    let options = options(&document, &style, &output, &[]);

    let err = run_with(&options, FontCache::shared(SyntheticBackend::new())).unwrap_err();
    assert!(matches!(err, CliError::Layout(LayoutError::CssSyntax { .. })), "{err}");
    assert!(!output.exists());

    std::fs::write(&style, "p { font-size: -4px }").unwrap();
    let err = run_with(&options, FontCache::shared(SyntheticBackend::new())).unwrap_err();
    assert!(
        matches!(err, CliError::Layout(LayoutError::InvalidStyleValue { .. })),
        "{err}"
    );
}

#[test]
fn test_binary_usage() {
    let quire = env!("CARGO_BIN_EXE_quire");

    let help = Command::new(quire).arg("--help").output().unwrap();
    assert!(help.status.success());
    assert!(String::from_utf8_lossy(&help.stdout).contains("--width"));

    let bad = Command::new(quire)
        .args(["doc.xhtml", "style.css", "--width", "0"])
        .output()
        .unwrap();
    assert_eq!(bad.status.code(), Some(2));

    let missing = Command::new(quire)
        .args(["/nonexistent/doc.xhtml", "/nonexistent/style.css"])
        .output()
        .unwrap();
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("cannot read"));
}
