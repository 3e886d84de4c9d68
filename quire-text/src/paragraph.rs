//! Shape-constrained paragraph layout.
//!
//! ## Pipeline
//!
//! ```text
//! AttributedText ──► segment() ──► Vec<Fragment>   (words split at hyphenation points)
//!                                       │
//!                      greedy / optimal │ line breaks, each line gets a band
//!                                       ▼
//!                                  Vec<Line> ──► place() ──► TextLayout
//! ```
//!
//! A fragment is an unbreakable run of visible characters. The glue after
//! it says what separates it from the next fragment: a space, a hyphenation
//! point, a point after an explicit hyphen, a forced break, or the end of
//! the paragraph. Every glue except `End` is a break opportunity.

use std::fmt;
use std::rc::Rc;

use quire_core::{Fixed, Shape};

use crate::attributed::{AttributeFlags, AttributedText, CodepointAttributes};
use crate::fonts::FontFace;
use crate::hyphen::{Hyphenator, SOFT_HYPHEN};
use crate::layout::{LayoutCommand, TextLayout};

/// Glyph drawn at a line end that breaks inside a word.
pub const HYPHEN: char = '-';

/// Line-level alignment. The justify variants name the anchor of the last
/// line (and of lines ending in a forced break).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Align {
    #[default]
    Left,
    Right,
    Center,
    JustifyLeft,
    JustifyRight,
}

/// Paragraph layout switches.
#[derive(Clone)]
pub struct LayoutProperties {
    pub align: Align,
    /// Extra inset of the first line on its leading edge.
    pub indent: Fixed,
    /// Text direction; decides which edge the indent applies to.
    pub ltr: bool,
    /// Choose breaks by minimum total badness instead of first fit.
    pub optimize: bool,
    pub hyphenate: bool,
    pub hyphenator: Option<Rc<dyn Hyphenator>>,
}

impl Default for LayoutProperties {
    fn default() -> Self {
        Self {
            align: Align::Left,
            indent: 0,
            ltr: true,
            optimize: false,
            hyphenate: false,
            hyphenator: None,
        }
    }
}

impl fmt::Debug for LayoutProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutProperties")
            .field("align", &self.align)
            .field("indent", &self.indent)
            .field("ltr", &self.ltr)
            .field("optimize", &self.optimize)
            .field("hyphenate", &self.hyphenate)
            .field("hyphenator", &self.hyphenator.is_some())
            .finish()
    }
}

/// Lay out `text` into `shape`, first line top at `y_start`.
///
/// The returned layout's height is the bottom edge of the last line
/// (`y_start` when the text is empty).
pub fn layout_paragraph(
    text: &AttributedText,
    shape: &Shape,
    props: &LayoutProperties,
    y_start: Fixed,
) -> TextLayout {
    let fragments = segment(text, props);
    if fragments.is_empty() {
        return TextLayout::with_height(y_start);
    }

    let ctx = Breaker {
        fragments: &fragments,
        shape,
        props,
    };
    let lines = if props.optimize {
        ctx.optimal(y_start)
    } else {
        ctx.greedy(y_start)
    };

    let mut layout = TextLayout::with_height(y_start);
    for line in &lines {
        place_line(text, &ctx, line, &mut layout);
    }
    if let Some(last) = lines.last() {
        layout.set_height(last.top + last.run.height());
    }

    log::debug!(
        "paragraph: {} chars, {} fragments, {} lines, height {}",
        text.len(),
        fragments.len(),
        lines.len(),
        layout.height()
    );
    layout
}

// ── Segmentation ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Glue {
    End,
    Space { start: usize, end: usize, width: Fixed },
    /// Hyphenation point; a hyphen is drawn if the line breaks here.
    Hyphen,
    /// After an explicit `-`; breaking draws nothing extra.
    Join,
    Forced,
}

#[derive(Clone, Debug)]
struct Fragment {
    start: usize,
    end: usize,
    width: Fixed,
    ascent: Fixed,
    descent: Fixed,
    glue: Glue,
    hyphen_width: Fixed,
}

impl Fragment {
    fn empty(at: usize, attrs: Option<&CodepointAttributes>) -> Self {
        Fragment {
            start: at,
            end: at,
            width: 0,
            ascent: attrs.map_or(0, |a| a.font.ascender()),
            descent: attrs.map_or(0, |a| a.font.descender()),
            glue: Glue::Forced,
            hyphen_width: 0,
        }
    }

    fn glue_width(&self) -> Fixed {
        match self.glue {
            Glue::Space { width, .. } => width,
            _ => 0,
        }
    }
}

fn segment(text: &AttributedText, props: &LayoutProperties) -> Vec<Fragment> {
    let chars = text.chars();
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' => {
                let start = i;
                let mut width = 0;
                while i < chars.len() && chars[i] == ' ' {
                    width += text.attributes_at(i).map_or(0, |a| a.font.char_advance(' '));
                    i += 1;
                }
                // Spaces after a forced break or at the start are dropped.
                if let Some(last) = fragments.last_mut() {
                    if last.glue == Glue::End {
                        last.glue = Glue::Space { start, end: i, width };
                    }
                }
            }
            '\n' => {
                // A break right after a break produces an empty line.
                let open = fragments
                    .last()
                    .map_or(false, |f| matches!(f.glue, Glue::End | Glue::Space { .. }));
                if open {
                    if let Some(last) = fragments.last_mut() {
                        last.glue = Glue::Forced;
                    }
                } else {
                    fragments.push(Fragment::empty(i, text.attributes_at(i)));
                }
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && chars[i] != ' ' && chars[i] != '\n' {
                    i += 1;
                }
                split_word(text, start, i, props, &mut fragments);
            }
        }
    }
    fragments
}

/// Split `chars[start..end]` at its break opportunities into fragments.
fn split_word(
    text: &AttributedText,
    start: usize,
    end: usize,
    props: &LayoutProperties,
    out: &mut Vec<Fragment>,
) {
    let chars = text.chars();
    let mut points: Vec<(usize, Glue)> = Vec::new();

    for k in start..end.saturating_sub(1) {
        if chars[k] == SOFT_HYPHEN {
            points.push((k + 1, Glue::Hyphen));
        } else if chars[k] == HYPHEN && k > start {
            points.push((k + 1, Glue::Join));
        }
    }

    if props.hyphenate {
        if let Some(hyphenator) = &props.hyphenator {
            dictionary_points(text, start, end, hyphenator.as_ref(), &mut points);
        }
    }

    points.sort_by_key(|&(at, _)| at);
    points.dedup_by_key(|&mut (at, _)| at);

    let mut piece_start = start;
    for (at, glue) in points {
        out.push(measure_piece(text, piece_start, at, glue));
        piece_start = at;
    }
    out.push(measure_piece(text, piece_start, end, Glue::End));
}

/// Ask the hyphenator about the alphabetic core of the word (leading and
/// trailing punctuation and soft hyphens stripped) and map its offsets back.
fn dictionary_points(
    text: &AttributedText,
    start: usize,
    end: usize,
    hyphenator: &dyn Hyphenator,
    points: &mut Vec<(usize, Glue)>,
) {
    let chars = text.chars();
    let letters: Vec<usize> = (start..end).filter(|&k| chars[k] != SOFT_HYPHEN).collect();
    let first = letters.iter().position(|&k| chars[k].is_alphabetic());
    let last = letters.iter().rposition(|&k| chars[k].is_alphabetic());
    let (Some(first), Some(last)) = (first, last) else {
        return;
    };
    let core = &letters[first..=last];
    let word: String = core.iter().map(|&k| chars[k]).collect();
    let lang = text
        .attributes_at(core[0])
        .map_or("", |a| a.lang.as_str());

    for offset in hyphenator.break_points(&word, lang) {
        if offset == 0 || offset >= core.len() {
            continue;
        }
        let at = core[offset];
        if chars[at - 1] != HYPHEN && chars[at - 1] != SOFT_HYPHEN {
            points.push((at, Glue::Hyphen));
        }
    }
}

fn measure_piece(text: &AttributedText, start: usize, end: usize, glue: Glue) -> Fragment {
    let chars = text.chars();
    let mut fragment = Fragment {
        start,
        end,
        width: 0,
        ascent: 0,
        descent: 0,
        glue,
        hyphen_width: 0,
    };
    for k in start..end {
        let Some(attrs) = text.attributes_at(k) else {
            continue;
        };
        fragment.ascent = fragment.ascent.max(attrs.font.ascender());
        fragment.descent = fragment.descent.max(attrs.font.descender());
        if chars[k] != SOFT_HYPHEN {
            fragment.width += attrs.font.char_advance(chars[k]);
        }
    }
    if glue == Glue::Hyphen && end > start {
        if let Some(attrs) = text.attributes_at(end - 1) {
            fragment.hyphen_width = attrs.font.char_advance(HYPHEN);
        }
    }
    fragment
}

// ── Line breaking ───────────────────────────────────────────────────

/// Extent of fragments `[a, b)` set on one line.
#[derive(Clone, Copy, Debug, Default)]
struct Run {
    body: Fixed,
    ascent: Fixed,
    descent: Fixed,
}

impl Run {
    fn new(first: &Fragment) -> Self {
        Run {
            body: first.width,
            ascent: first.ascent,
            descent: first.descent,
        }
    }

    fn extend(&mut self, prev: &Fragment, next: &Fragment) {
        self.body += prev.glue_width() + next.width;
        self.ascent = self.ascent.max(next.ascent);
        self.descent = self.descent.max(next.descent);
    }

    /// Natural width when the line ends after `last`.
    fn width(&self, last: &Fragment) -> Fixed {
        match last.glue {
            Glue::Hyphen => self.body + last.hyphen_width,
            _ => self.body,
        }
    }

    fn height(&self) -> Fixed {
        self.ascent + self.descent
    }
}

#[derive(Clone, Copy, Debug)]
struct Line {
    start: usize,
    end: usize,
    top: Fixed,
    run: Run,
}

struct Breaker<'a> {
    fragments: &'a [Fragment],
    shape: &'a Shape,
    props: &'a LayoutProperties,
}

const OVERFLOW_COST: i64 = 1 << 40;
/// Cost of ending a line with a hyphen: as bad as 8 px of slack.
const HYPHEN_COST: i64 = (8 * 64) * (8 * 64);

impl Breaker<'_> {
    /// Width available to a line starting at fragment `first` with the
    /// given band.
    fn available(&self, first: usize, top: Fixed, height: Fixed) -> Fixed {
        let indent = if first == 0 { self.props.indent } else { 0 };
        self.shape.width(top, top + height) - indent
    }

    fn greedy(&self, y_start: Fixed) -> Vec<Line> {
        let frags = self.fragments;
        let mut lines = Vec::new();
        let mut start = 0;
        let mut top = y_start;

        while start < frags.len() {
            let mut run = Run::new(&frags[start]);
            let mut end = start + 1;
            while end < frags.len() && frags[end - 1].glue != Glue::Forced {
                let mut wider = run;
                wider.extend(&frags[end - 1], &frags[end]);
                if wider.width(&frags[end]) > self.available(start, top, wider.height()) {
                    break;
                }
                run = wider;
                end += 1;
            }
            lines.push(Line { start, end, top, run });
            top += run.height();
            start = end;
        }
        lines
    }

    /// Minimum summed squared slack over all break sets.
    ///
    /// A shaped column's width depends on the y a line starts at, so each
    /// break point keeps its cheapest arrival per distinct y instead of a
    /// single cheapest arrival.
    fn optimal(&self, y_start: Fixed) -> Vec<Line> {
        #[derive(Clone, Copy)]
        struct Node {
            cost: i64,
            top: Fixed,
            /// Break point and slot of the previous node.
            from: (usize, usize),
            run: Run,
        }

        let frags = self.fragments;
        let n = frags.len();
        let mut nodes: Vec<Vec<Node>> = vec![Vec::new(); n + 1];
        nodes[0].push(Node {
            cost: 0,
            top: y_start,
            from: (0, 0),
            run: Run::default(),
        });

        for i in 0..n {
            for slot in 0..nodes[i].len() {
                let node = nodes[i][slot];
                let mut run = Run::new(&frags[i]);
                for j in (i + 1)..=n {
                    if j > i + 1 {
                        run.extend(&frags[j - 2], &frags[j - 1]);
                    }
                    let last = &frags[j - 1];
                    let forced = last.glue == Glue::Forced;
                    let slack = self.available(i, node.top, run.height()) - run.width(last);

                    if slack < 0 && j > i + 1 {
                        break;
                    }
                    let mut cost = if slack < 0 {
                        OVERFLOW_COST + (slack as i64) * (slack as i64)
                    } else if j == n || forced {
                        0
                    } else {
                        (slack as i64) * (slack as i64)
                    };
                    if last.glue == Glue::Hyphen && j < n {
                        cost += HYPHEN_COST;
                    }

                    let arrival = Node {
                        cost: node.cost + cost,
                        top: node.top + run.height(),
                        from: (i, slot),
                        run,
                    };
                    match nodes[j].iter_mut().find(|b| b.top == arrival.top) {
                        Some(b) if arrival.cost < b.cost => *b = arrival,
                        Some(_) => {}
                        None => nodes[j].push(arrival),
                    }
                    if forced {
                        break;
                    }
                }
            }
        }

        let mut lines = Vec::new();
        let cheapest = nodes[n]
            .iter()
            .enumerate()
            .min_by_key(|(_, node)| node.cost)
            .map(|(slot, _)| slot);
        let Some(slot) = cheapest else {
            return lines;
        };
        let mut at = (n, slot);
        while at.0 > 0 {
            let node = nodes[at.0][at.1];
            lines.push(Line {
                start: node.from.0,
                end: at.0,
                top: node.top - node.run.height(),
                run: node.run,
            });
            at = node.from;
        }
        lines.reverse();
        lines
    }
}

// ── Placement ───────────────────────────────────────────────────────

struct Underline {
    x0: Fixed,
    x1: Fixed,
    y: Fixed,
    h: Fixed,
    color: quire_core::Color,
}

fn add_underline(runs: &mut Vec<Underline>, x0: Fixed, x1: Fixed, baseline: Fixed, attrs: &CodepointAttributes) {
    if !attrs.flags.contains(AttributeFlags::UNDERLINE) || x1 <= x0 {
        return;
    }
    let metrics = attrs.font.metrics();
    let h = metrics.underline_thickness.max(1);
    let y = baseline + metrics.underline_position - h / 2;
    if let Some(last) = runs.last_mut() {
        if last.x1 == x0 && last.y == y && last.h == h && last.color == attrs.color {
            last.x1 = x1;
            return;
        }
    }
    runs.push(Underline {
        x0,
        x1,
        y,
        h,
        color: attrs.color,
    });
}

fn glyph(face: &Rc<FontFace>, glyph: u32, x: Fixed, y: Fixed, attrs: &CodepointAttributes) -> LayoutCommand {
    LayoutCommand::Glyph {
        x,
        y,
        face: Rc::clone(face),
        glyph,
        color: attrs.color,
        blur: 0,
    }
}

fn place_line(text: &AttributedText, ctx: &Breaker<'_>, line: &Line, layout: &mut TextLayout) {
    let frags = ctx.fragments;
    let props = ctx.props;
    let chars = text.chars();
    let last = &frags[line.end - 1];

    let height = line.run.height();
    let baseline = line.top + line.run.ascent;
    let mut left = ctx.shape.left(line.top, line.top + height);
    let mut right = ctx.shape.right(line.top, line.top + height);
    if line.start == 0 {
        if props.ltr {
            left += props.indent;
        } else {
            right -= props.indent;
        }
    }

    let natural = line.run.width(last);
    let final_line = line.end == frags.len() || last.glue == Glue::Forced;
    let gaps = frags[line.start..line.end - 1]
        .iter()
        .filter(|f| matches!(f.glue, Glue::Space { .. }))
        .count() as Fixed;

    let (x0, extra) = match props.align {
        Align::Left => (left, 0),
        Align::Right => (right - natural, 0),
        Align::Center => (left + (right - left - natural) / 2, 0),
        Align::JustifyLeft | Align::JustifyRight if !final_line && gaps > 0 => {
            (left, right - left - natural)
        }
        Align::JustifyLeft => (left, 0),
        Align::JustifyRight => (right - natural, 0),
    };
    let (per_gap, remainder) = if gaps > 0 {
        (extra.div_euclid(gaps), extra.rem_euclid(gaps))
    } else {
        (0, 0)
    };

    let mut shadows = Vec::new();
    let mut glyphs = Vec::new();
    let mut underlines = Vec::new();
    let mut pen = x0;
    let mut gap = 0;

    for (k, frag) in frags.iter().enumerate().take(line.end).skip(line.start) {
        for idx in frag.start..frag.end {
            let ch = chars[idx];
            let Some(attrs) = text.attributes_at(idx) else {
                continue;
            };
            if ch == SOFT_HYPHEN {
                continue;
            }
            let index = attrs.font.glyph_index(ch);
            let advance = attrs.font.advance(index);
            for s in &attrs.shadows {
                shadows.push(LayoutCommand::Glyph {
                    x: pen + s.dx,
                    y: baseline + s.dy,
                    face: Rc::clone(&attrs.font),
                    glyph: index,
                    color: s.color,
                    blur: s.blur,
                });
            }
            glyphs.push(glyph(&attrs.font, index, pen, baseline, attrs));
            add_underline(&mut underlines, pen, pen + advance, baseline, attrs);
            pen += advance;
        }

        if k + 1 < line.end {
            if let Glue::Space { start, end, .. } = frag.glue {
                for idx in start..end {
                    let Some(attrs) = text.attributes_at(idx) else {
                        continue;
                    };
                    let mut advance = attrs.font.char_advance(' ');
                    if idx + 1 == end {
                        advance += per_gap + if gap < remainder { 1 } else { 0 };
                    }
                    add_underline(&mut underlines, pen, pen + advance, baseline, attrs);
                    pen += advance;
                }
                gap += 1;
            }
        } else if frag.glue == Glue::Hyphen && frag.end > frag.start {
            if let Some(attrs) = text.attributes_at(frag.end - 1) {
                let index = attrs.font.glyph_index(HYPHEN);
                glyphs.push(glyph(&attrs.font, index, pen, baseline, attrs));
                pen += attrs.font.advance(index);
            }
        }
    }

    let (lo, hi) = (x0.min(pen), x0.max(pen));
    for command in shadows.into_iter().chain(glyphs) {
        layout.push(command, lo, hi);
    }
    for u in underlines {
        layout.push(LayoutCommand::rect(u.x0, u.y, u.x1 - u.x0, u.h, u.color), lo, hi);
    }
}

// ===================================================================
// Tests
// ===================================================================
