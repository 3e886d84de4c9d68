//! quire: lay out an XHTML document with a CSS style sheet.
//!
//! Reads the document and the style sheet, registers the fonts given on
//! the command line (or installed fonts found by family name), lays the
//! document out into a column of the requested width and writes the
//! persisted layout as JSON.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use log::{debug, info};
use quire_core::{px, LayoutError, Shape, FIXED_ONE};
use quire_layout::{layout_xhtml, save_layout, StyleSheet};
use quire_render::{LayoutRenderer, QuadInstance, RenderError, RenderTarget};
use quire_text::{
    find_system_font, EnglishHyphenator, FontAxes, FontCache, FontResource, SubPixelArrangement,
    SystemFontBackend,
};
use thiserror::Error;

/// Widest column whose 1/64 px width still fits a `Fixed`.
pub const MAX_WIDTH: i32 = i32::MAX / FIXED_ONE;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no installed font for family '{0}'")]
    NoSystemFont(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A font registration from `--font` or `--system`.
#[derive(Clone, Debug, PartialEq)]
pub struct FontArg {
    pub family: String,
    /// `None` for `--system`: looked up among installed fonts.
    pub path: Option<String>,
    pub axes: FontAxes,
}

/// Lay out an XHTML document and print the persisted layout as JSON.
#[derive(Parser, Debug)]
#[command(name = "quire", version, about)]
pub struct Options {
    /// XHTML document to lay out.
    pub document: PathBuf,

    /// CSS style sheet for the document.
    pub style: PathBuf,

    /// Column width in pixels.
    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(i32).range(1..=i64::from(MAX_WIDTH)))]
    pub width: i32,

    /// Register a font file under a family.
    #[arg(long = "font", value_name = "FAMILY=PATH[:style[:variant[:weight[:stretch]]]]", value_parser = parse_font)]
    pub fonts: Vec<FontArg>,

    /// Register the installed font closest to a family and axes.
    #[arg(long = "system", value_name = "FAMILY[:style[:variant[:weight[:stretch]]]]", value_parser = parse_system_font)]
    pub system_fonts: Vec<FontArg>,

    /// Break lines first-fit instead of minimizing total slack.
    #[arg(long)]
    pub greedy: bool,

    /// Do not hyphenate.
    #[arg(long)]
    pub no_hyphenate: bool,

    /// Also draw the layout through a glyph atlas of this many pixels square.
    #[arg(long, value_name = "ATLAS_PX", value_parser = clap::value_parser!(u32).range(1..))]
    pub render: Option<u32>,

    /// Write the layout here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// `FAMILY=PATH[:axes]`.
fn parse_font(text: &str) -> Result<FontArg, String> {
    let (family, rest) = text
        .split_once('=')
        .ok_or_else(|| format!("expected FAMILY=PATH, got '{text}'"))?;
    let (path, axes) = split_axes(rest)?;
    if family.trim().is_empty() {
        return Err(format!("missing family in '{text}'"));
    }
    Ok(FontArg {
        family: family.trim().to_string(),
        path: Some(path.to_string()),
        axes,
    })
}

/// `FAMILY[:axes]`.
fn parse_system_font(text: &str) -> Result<FontArg, String> {
    let (family, axes) = split_axes(text)?;
    Ok(FontArg {
        family: family.to_string(),
        path: None,
        axes,
    })
}

/// `name[:style[:variant[:weight[:stretch]]]]` → name and axes.
fn split_axes(text: &str) -> Result<(&str, FontAxes), String> {
    let mut parts = text.split(':');
    let name = parts.next().unwrap_or_default();
    let mut axis = |default: &'static str| parts.next().unwrap_or(default);
    let (style, variant, weight, stretch) =
        (axis("normal"), axis("normal"), axis("normal"), axis("normal"));
    let axes = FontAxes::from_css(style, variant, weight, stretch)
        .ok_or_else(|| format!("bad font axes in '{text}'"))?;
    if name.is_empty() {
        return Err(format!("missing font name in '{text}'"));
    }
    Ok((name, axes))
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Counts what a back-end would have to do.
#[derive(Default)]
struct CountingTarget {
    uploaded_bytes: usize,
    quads: usize,
}

impl RenderTarget for CountingTarget {
    fn upload_atlas(&mut self, data: &[u8], _size: u32) {
        self.uploaded_bytes += data.len();
    }

    fn draw_quads(&mut self, quads: &[QuadInstance]) {
        self.quads += quads.len();
    }

    fn draw_image(&mut self, _x: f32, _y: f32, _w: f32, _h: f32, url: &str) {
        debug!("image '{url}' left to the host");
    }
}

/// Run with fonts opened from disk.
pub fn run(options: &Options) -> Result<(), CliError> {
    run_with(options, FontCache::shared(SystemFontBackend))
}

/// Run with fonts opened through `cache`.
pub fn run_with(options: &Options, cache: Rc<FontCache>) -> Result<(), CliError> {
    let document = read(&options.document)?;
    let css = read(&options.style)?;

    let mut sheet = StyleSheet::new(cache);
    for font in options.fonts.iter().chain(&options.system_fonts) {
        let resource = match &font.path {
            Some(path) => FontResource::new(path.as_str()).with_axes(font.axes),
            None => find_system_font(&font.family, &font.axes)
                .ok_or_else(|| CliError::NoSystemFont(font.family.clone()))?,
        };
        info!("font '{}' ({}): {}", font.family, font.axes, resource.source);
        sheet.add_font(&font.family, resource);
    }
    sheet.add_css(&css)?;
    sheet.set_use_optimizing_layouter(!options.greedy);
    sheet.set_hyphenate(!options.no_hyphenate);
    sheet.set_hyphenator(Some(Rc::new(EnglishHyphenator)));

    let layout = layout_xhtml(&document, &sheet, &Shape::rectangle(px(options.width)))?;
    info!(
        "laid out '{}': {} commands, height {} px",
        options.document.display(),
        layout.commands().len(),
        layout.height() / FIXED_ONE
    );

    if let Some(atlas_size) = options.render {
        let mut renderer = LayoutRenderer::new(atlas_size, SubPixelArrangement::None);
        let mut target = CountingTarget::default();
        let stats = renderer.show_layout(&layout, 0, 0, &mut target)?;
        info!(
            "render: {} passes, {} uploads ({} bytes), {} quads in {} draw calls",
            stats.passes, stats.uploads, target.uploaded_bytes, target.quads, stats.draw_calls
        );
    }

    let json = save_layout(&layout)?;
    match &options.output {
        Some(path) => std::fs::write(path, json).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?,
        None => println!("{json}"),
    }
    Ok(())
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use quire_text::FontStyle;

    fn parse(args: &[&str]) -> Result<Options, clap::Error> {
        Options::try_parse_from(std::iter::once("quire").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_defaults() {
        let options = parse(&["doc.xhtml", "style.css"]).unwrap();
        assert_eq!(options.document, PathBuf::from("doc.xhtml"));
        assert_eq!(options.style, PathBuf::from("style.css"));
        assert_eq!(options.width, 600);
        assert!(!options.greedy && !options.no_hyphenate);
        assert!(options.fonts.is_empty() && options.system_fonts.is_empty());
        assert_eq!((options.render, options.output), (None, None));
    }

    #[test]
    fn test_parse_fonts_and_flags() {
        let options = parse(&[
            "--font",
            "serif=/fonts/a.ttf:italic:normal:700",
            "doc.xhtml",
            "--system",
            "sans",
            "style.css",
            "--width=320",
            "--greedy",
            "--render",
            "512",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(options.width, 320);
        assert!(options.greedy);
        assert_eq!(options.render, Some(512));
        assert_eq!(options.output, Some(PathBuf::from("out.json")));

        let serif = &options.fonts[0];
        assert_eq!(serif.family, "serif");
        assert_eq!(serif.path.as_deref(), Some("/fonts/a.ttf"));
        assert_eq!(serif.axes.style, FontStyle::Italic);
        assert_eq!(serif.axes.weight, 700);
        assert_eq!(options.system_fonts[0].path, None);
        assert_eq!(options.system_fonts[0].axes, FontAxes::default());
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            &["doc.xhtml"][..],
            &["a", "b", "c"],
            &["a", "b", "--width"],
            &["a", "b", "--width", "0"],
            &["a", "b", "--width=-3"],
            &["a", "b", "--font", "nopath"],
            &["a", "b", "--font", "x=f.ttf:sideways"],
            &["a", "b", "--system", ":italic"],
            &["a", "b", "--render", "0"],
            &["a", "b", "--frobnicate"],
        ] {
            assert!(parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_width_must_fit_fixed_point() {
        let max = MAX_WIDTH.to_string();
        assert_eq!(parse(&["a", "b", "--width", &max]).unwrap().width, MAX_WIDTH);
        assert!(px(MAX_WIDTH) > 0);

        let over = (i64::from(MAX_WIDTH) + 1).to_string();
        let err = parse(&["a", "b", "--width", &over]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse(&["--version"]).unwrap_err().kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let options = parse(&["/nonexistent/doc.xhtml", "s.css"]).unwrap();
        let err = run(&options).unwrap_err();
        assert!(err.to_string().starts_with("cannot read '/nonexistent/doc.xhtml'"));
    }
}
