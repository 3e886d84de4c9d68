//! Style sheet and cascade.
//!
//! A [`StyleSheet`] is an insertion-ordered list of `(selector, attribute,
//! value)` rules plus the font families the document may name. Lookups scan
//! the rule list linearly on every call; the first rule reaching the highest
//! priority wins, so two equally specific rules resolve to the earlier one.

use std::fmt;
use std::rc::Rc;

use cssparser::{
    BasicParseErrorKind, Delimiter, ParseError, ParseErrorKind, Parser, ParserInput,
    SourceLocation, Token,
};
use log::debug;
use quire_core::{LayoutError, MarkupNode};
use quire_text::{FontCache, FontFamily, FontResource, Hyphenator, LayoutProperties};
use rustc_hash::FxHashMap;

use crate::xhtml::is_valid_value;

/// Attributes looked up on ancestors when no rule matches the node itself.
const INHERITING: &[&str] = &[
    "color",
    "direction",
    "font-family",
    "font-size",
    "font-stretch",
    "font-style",
    "font-variant",
    "font-weight",
    "text-align",
    "text-align-last",
    "text-indent",
    "text-shadow",
];

pub fn is_inheriting(attribute: &str) -> bool {
    INHERITING.contains(&attribute)
}

/// Value used when neither a rule nor the caller supplies one.
pub fn default_value(attribute: &str) -> &'static str {
    match attribute {
        "color" => "#000000",
        "font-family" => "sans",
        "font-size" => "16px",
        "font-style" | "font-variant" | "font-weight" | "font-stretch" => "normal",
        "direction" => "ltr",
        "text-indent" | "padding" | "margin" | "border-width" => "0",
        "background-color" => "transparent",
        "text-decoration" | "text-shadow" => "none",
        _ => "",
    }
}

// ── Selectors ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
enum Condition {
    Class(String),
    Id(String),
    HasAttribute(String),
    AttributeEquals(String, String),
    FirstChild,
}

impl Condition {
    fn matches<N: MarkupNode>(&self, node: N) -> bool {
        match self {
            Condition::Class(class) => node.has_class(class),
            Condition::Id(id) => node.attribute("id") == Some(id.as_str()),
            Condition::HasAttribute(name) => node.attribute(name).is_some(),
            Condition::AttributeEquals(name, value) => node.attribute(name) == Some(value.as_str()),
            Condition::FirstChild => node.previous_element().is_none(),
        }
    }
}

/// Tag test plus conditions, e.g. `p.note:first-child`. No tag means `*`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

impl Compound {
    fn matches<N: MarkupNode>(&self, node: N) -> bool {
        node.is_element()
            && self.tag.as_deref().map_or(true, |tag| tag == node.name())
            && self.conditions.iter().all(|c| c.matches(node))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A parsed selector, stored right to left.
///
/// `chain[0]` is the compound directly left of the subject together with
/// the combinator joining the two, and so on outwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    subject: Compound,
    chain: Vec<(Combinator, Compound)>,
    priority: u32,
}

impl Selector {
    /// Parse a single selector; a comma-separated list is rejected.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let mut list = parse_selector_list(text)?;
        match (list.pop(), list.is_empty()) {
            (Some(selector), true) => Ok(selector),
            _ => Err(LayoutError::InvalidSelector(text.trim().to_string())),
        }
    }

    /// `1 + 10000·ids + 100·(classes, attributes, pseudo-classes) + tags`.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn matches<N: MarkupNode>(&self, node: N) -> bool {
        self.subject.matches(node) && match_chain(&self.chain, node)
    }
}

fn specificity(compound: &Compound) -> u32 {
    let mut score = u32::from(compound.tag.is_some());
    for condition in &compound.conditions {
        score += match condition {
            Condition::Id(_) => 10_000,
            _ => 100,
        };
    }
    score
}

fn match_chain<N: MarkupNode>(chain: &[(Combinator, Compound)], node: N) -> bool {
    let Some(((combinator, compound), rest)) = chain.split_first() else {
        return true;
    };
    let mut parent = element_parent(node);
    match combinator {
        Combinator::Child => {
            parent.is_some_and(|p| compound.matches(p) && match_chain(rest, p))
        }
        Combinator::Descendant => {
            while let Some(p) = parent {
                if compound.matches(p) && match_chain(rest, p) {
                    return true;
                }
                parent = element_parent(p);
            }
            false
        }
    }
}

fn element_parent<N: MarkupNode>(node: N) -> Option<N> {
    node.parent().filter(|p| p.is_element())
}

// ── Selector grammar ───────────────────────────────────────────────

/// `selector[, selector]...`, tokenized with the CSS tokenizer so quoted
/// attribute values may hold any character.
fn parse_selector_list(text: &str) -> Result<Vec<Selector>, LayoutError> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|p| p.parse_comma_separated(read_selector))
        .map_err(|_: ParseError<'_, ()>| LayoutError::InvalidSelector(text.trim().to_string()))
}

fn invalid<'i>(input: &Parser<'i, '_>) -> ParseError<'i, ()> {
    input.new_custom_error(())
}

fn read_selector<'i>(input: &mut Parser<'i, '_>) -> Result<Selector, ParseError<'i, ()>> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut current: Option<Compound> = None;
    let mut pending: Option<Combinator> = None;
    // Set once the compound being read has a simple selector.
    let mut started = false;

    loop {
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => {
                if current.is_some() {
                    pending.get_or_insert(Combinator::Descendant);
                }
            }
            Token::Delim('>') => {
                if current.is_none() || pending == Some(Combinator::Child) {
                    return Err(invalid(input));
                }
                pending = Some(Combinator::Child);
            }
            token => {
                if let Some(combinator) = pending.take() {
                    compounds.extend(current.take());
                    combinators.push(combinator);
                    started = false;
                }
                let compound = current.get_or_insert_with(Compound::default);
                read_simple(input, compound, token, started)?;
                started = true;
            }
        }
    }
    if pending == Some(Combinator::Child) {
        return Err(invalid(input));
    }

    let subject = current.ok_or_else(|| invalid(input))?;
    let chain: Vec<_> = combinators
        .into_iter()
        .rev()
        .zip(compounds.into_iter().rev())
        .collect();
    let priority = std::iter::once(&subject)
        .chain(chain.iter().map(|(_, c)| c))
        .map(specificity)
        .sum::<u32>()
        + 1;

    Ok(Selector {
        subject,
        chain,
        priority,
    })
}

/// Add the simple selector starting at `token` to `compound`. A type
/// selector or `*` may only open a compound.
fn read_simple<'i>(
    input: &mut Parser<'i, '_>,
    compound: &mut Compound,
    token: Token<'i>,
    started: bool,
) -> Result<(), ParseError<'i, ()>> {
    let condition = match token {
        Token::Ident(tag) if !started => {
            compound.tag = Some(tag.to_string());
            return Ok(());
        }
        Token::Delim('*') if !started => return Ok(()),
        Token::IDHash(id) => Condition::Id(id.to_string()),
        Token::Delim('.') => match input.next_including_whitespace().ok().cloned() {
            Some(Token::Ident(class)) => Condition::Class(class.to_string()),
            _ => return Err(invalid(input)),
        },
        Token::Colon => match input.next_including_whitespace().ok().cloned() {
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("first-child") => {
                Condition::FirstChild
            }
            _ => return Err(invalid(input)),
        },
        Token::SquareBracketBlock => input.parse_nested_block(read_attribute)?,
        _ => return Err(invalid(input)),
    };
    compound.conditions.push(condition);
    Ok(())
}

/// Inside `[...]`: `name` or `name=value`, the value an identifier or a
/// quoted string.
fn read_attribute<'i>(block: &mut Parser<'i, '_>) -> Result<Condition, ParseError<'i, ()>> {
    let name = block.expect_ident()?.to_string();
    if block.is_exhausted() {
        return Ok(Condition::HasAttribute(name));
    }
    block.expect_delim('=')?;
    let value = block.expect_ident_or_string()?.to_string();
    block.expect_exhausted()?;
    Ok(Condition::AttributeEquals(name, value))
}

// ── Style sheet ────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct StyleRule {
    selector: Selector,
    attribute: String,
    value: String,
}

/// Rules, font families and layouter switches for one document style.
pub struct StyleSheet {
    rules: Vec<StyleRule>,
    families: FxHashMap<String, FontFamily>,
    cache: Rc<FontCache>,
    optimize: bool,
    hyphenate: bool,
    hyphenator: Option<Rc<dyn Hyphenator>>,
}

impl StyleSheet {
    /// Empty sheet whose families open faces through `cache`.
    pub fn new(cache: Rc<FontCache>) -> Self {
        Self {
            rules: Vec::new(),
            families: FxHashMap::default(),
            cache,
            optimize: true,
            hyphenate: true,
            hyphenator: None,
        }
    }

    pub fn font_cache(&self) -> &Rc<FontCache> {
        &self.cache
    }

    /// Add one rule. The selector is parsed here and values of attributes
    /// the layouter interprets are checked; the value is kept verbatim.
    pub fn add_rule(
        &mut self,
        selector: &str,
        attribute: &str,
        value: &str,
    ) -> Result<(), LayoutError> {
        let parsed = Selector::parse(selector)?;
        let (attribute, value) = (attribute.trim(), value.trim());
        if !is_valid_value(attribute, value) {
            return Err(LayoutError::invalid_value(attribute, value, selector.trim()));
        }
        self.rules.push(StyleRule {
            selector: parsed,
            attribute: attribute.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Read `selector[, selector] { attribute: value; ... }` blocks.
    ///
    /// Rules are appended in source order, one per selector per declaration.
    /// Tokenizing follows CSS syntax: comments are skipped, quoted strings may
    /// hold `;`, `,` and braces, and a block left open at the end of the text
    /// is closed there. On error nothing from `css` is kept.
    pub fn add_css(&mut self, css: &str) -> Result<(), LayoutError> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut parsed = Vec::new();

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            let location = parser.current_source_location();
            let start = parser.position();
            let mut end = start;
            let has_block = loop {
                match parser.next_including_whitespace() {
                    Ok(Token::CurlyBracketBlock) => break true,
                    Ok(_) => end = parser.position(),
                    Err(_) => break false,
                }
            };

            let prelude = parser.slice(start..end).trim();
            if prelude.starts_with('@') {
                return Err(syntax(css, location, "at-rules are not supported"));
            }
            if !has_block {
                return Err(syntax(css, location, "expected '{' after selector"));
            }
            let selectors = parse_selector_list(prelude)?;
            let declarations = parser
                .parse_nested_block(read_declarations)
                .map_err(|err| css_error(css, err))?;

            for (attribute, value) in declarations {
                if !is_valid_value(&attribute, value) {
                    return Err(LayoutError::invalid_value(attribute, value, prelude));
                }
                for selector in &selectors {
                    parsed.push(StyleRule {
                        selector: selector.clone(),
                        attribute: attribute.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }

        debug!("style sheet: {} rules read", parsed.len());
        self.rules.extend(parsed);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add `resource` to `family`, creating the family on first use.
    pub fn add_font(&mut self, family: &str, resource: FontResource) {
        let cache = &self.cache;
        self.families
            .entry(family.to_string())
            .or_insert_with(|| FontFamily::new(family, Rc::clone(cache)))
            .add(resource);
    }

    pub fn find_family(&self, name: &str) -> Option<&FontFamily> {
        self.families.get(name)
    }

    /// Resolve `attribute` for `node`.
    ///
    /// The highest-priority matching rule wins, the earliest one on ties.
    /// Without a match, a non-inheriting attribute yields `default` (or the
    /// built-in default when `default` is empty) and an inheriting one is
    /// looked up on the parent, falling back to the built-in default above
    /// the root element.
    pub fn resolve<'a, N: MarkupNode>(
        &'a self,
        node: N,
        attribute: &str,
        default: &'a str,
    ) -> &'a str {
        let mut cursor = Some(node);
        while let Some(current) = cursor.filter(|n| n.is_element()) {
            let mut best: Option<&StyleRule> = None;
            for rule in &self.rules {
                if rule.attribute == attribute
                    && best.map_or(true, |b| rule.selector.priority > b.selector.priority)
                    && rule.selector.matches(current)
                {
                    best = Some(rule);
                }
            }
            if let Some(rule) = best {
                return &rule.value;
            }
            if !is_inheriting(attribute) {
                return if default.is_empty() {
                    default_value(attribute)
                } else {
                    default
                };
            }
            cursor = current.parent();
        }
        default_value(attribute)
    }

    // ── Layouter switches ──────────────────────────────────────────

    pub fn set_use_optimizing_layouter(&mut self, on: bool) {
        self.optimize = on;
    }

    pub fn use_optimizing_layouter(&self) -> bool {
        self.optimize
    }

    pub fn set_hyphenate(&mut self, on: bool) {
        self.hyphenate = on;
    }

    pub fn hyphenate(&self) -> bool {
        self.hyphenate
    }

    pub fn set_hyphenator(&mut self, hyphenator: Option<Rc<dyn Hyphenator>>) {
        self.hyphenator = hyphenator;
    }

    pub fn hyphenator(&self) -> Option<&Rc<dyn Hyphenator>> {
        self.hyphenator.as_ref()
    }

    /// Paragraph properties carrying this sheet's switches; alignment,
    /// indent and direction are left at their defaults.
    pub fn layout_properties(&self) -> LayoutProperties {
        LayoutProperties {
            optimize: self.optimize,
            hyphenate: self.hyphenate,
            hyphenator: self.hyphenator.clone(),
            ..LayoutProperties::default()
        }
    }
}

impl fmt::Debug for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<_> = self.families.keys().collect();
        families.sort();
        f.debug_struct("StyleSheet")
            .field("rules", &self.rules.len())
            .field("families", &families)
            .field("optimize", &self.optimize)
            .field("hyphenate", &self.hyphenate)
            .finish()
    }
}

// ── Declaration blocks ─────────────────────────────────────────────

type CssResult<'i, T> = Result<T, ParseError<'i, &'static str>>;

/// `attribute: value` pairs of one block, attribute names lowercased.
/// Errors point at the start of the offending declaration.
fn read_declarations<'i>(block: &mut Parser<'i, '_>) -> CssResult<'i, Vec<(String, &'i str)>> {
    let mut declarations = Vec::new();
    loop {
        block.skip_whitespace();
        if block.is_exhausted() {
            return Ok(declarations);
        }
        let location = block.current_source_location();
        let declaration = block
            .parse_until_after(Delimiter::Semicolon, read_declaration)
            .map_err(|err| ParseError {
                kind: err.kind,
                location,
            })?;
        declarations.extend(declaration);
    }
}

/// One declaration up to the next `;`; `None` for an empty one.
fn read_declaration<'i>(input: &mut Parser<'i, '_>) -> CssResult<'i, Option<(String, &'i str)>> {
    if input.is_exhausted() {
        return Ok(None);
    }
    let attribute = input.expect_ident()?.to_ascii_lowercase();
    input.expect_colon()?;
    let start = input.position();
    while input.next().is_ok() {}
    let value = input.slice_from(start).trim();
    if value.is_empty() {
        return Err(input.new_custom_error("empty value"));
    }
    Ok(Some((attribute, value)))
}

fn css_error(css: &str, err: ParseError<'_, &'static str>) -> LayoutError {
    let message = match err.kind {
        ParseErrorKind::Custom(message) => message.to_string(),
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected {token:?}")
        }
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
            "expected 'attribute: value'".to_string()
        }
        ParseErrorKind::Basic(other) => format!("{other:?}"),
    };
    syntax(css, err.location, &message)
}

fn syntax(css: &str, location: SourceLocation, message: &str) -> LayoutError {
    LayoutError::CssSyntax {
        offset: byte_offset(css, location),
        message: message.to_string(),
    }
}

/// Byte offset of a tokenizer location: zero-based line, one-based column
/// counted in UTF-16 units.
fn byte_offset(css: &str, location: SourceLocation) -> usize {
    let line_start: usize = css
        .split_inclusive('\n')
        .take(location.line as usize)
        .map(str::len)
        .sum();
    let column = location.column.saturating_sub(1) as usize;
    let mut units = 0;
    for (index, c) in css[line_start..].char_indices() {
        if units >= column {
            return line_start + index;
        }
        units += c.len_utf16();
    }
    css.len()
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::XmlDocument;
    use quire_text::SyntheticBackend;

    fn sheet() -> StyleSheet {
        StyleSheet::new(FontCache::shared(SyntheticBackend::new()))
    }

    /// Find the first element named `name` in document order.
    fn find<'a, 'i>(doc: &'a XmlDocument<'i>, name: &str) -> quire_core::XmlNode<'a, 'i> {
        fn walk<N: MarkupNode>(node: N, name: &str) -> Option<N> {
            if node.is_element() && node.name() == name {
                return Some(node);
            }
            node.children().into_iter().find_map(|c| walk(c, name))
        }
        walk(doc.root(), name).expect("element present")
    }

    const DOC: &str = r#"<html><body class="main"><h1 id="top">T</h1><p class="a b" lang="en">x<span>y</span></p><p>z</p></body></html>"#;

    #[test]
    fn test_priority_weights() {
        assert_eq!(Selector::parse("*").unwrap().priority(), 1);
        assert_eq!(Selector::parse("p").unwrap().priority(), 2);
        assert_eq!(Selector::parse("p.a").unwrap().priority(), 102);
        assert_eq!(Selector::parse("#top").unwrap().priority(), 10_001);
        assert_eq!(Selector::parse("body > p:first-child").unwrap().priority(), 103);
        assert_eq!(Selector::parse("[lang=en]").unwrap().priority(), 101);
    }

    #[test]
    fn test_rejects_bad_selectors() {
        for bad in [
            "", "p >", "> p", "p >> q", "p..a", "p:hover", "[x=", "p,q", "[a=]", "*p", "p.", "[a b]",
        ] {
            assert!(
                matches!(Selector::parse(bad), Err(LayoutError::InvalidSelector(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_more_specific_rule_wins() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let mut s = sheet();
        s.add_rule("body", "color", "#aaaaaa").unwrap();
        s.add_rule("h1", "color", "#bbbbbb").unwrap();
        assert_eq!(s.resolve(find(&doc, "h1"), "color", ""), "#bbbbbb");
        // The paragraph inherits from body.
        assert_eq!(s.resolve(find(&doc, "p"), "color", ""), "#aaaaaa");
    }

    #[test]
    fn test_tie_goes_to_first_rule() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let mut s = sheet();
        s.add_rule("p.a", "margin", "1px").unwrap();
        s.add_rule("p.b", "margin", "2px").unwrap();
        assert_eq!(s.resolve(find(&doc, "p"), "margin", ""), "1px");
    }

    #[test]
    fn test_non_inheriting_uses_caller_default() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let mut s = sheet();
        s.add_rule("body", "margin", "9px").unwrap();
        let p = find(&doc, "p");
        assert_eq!(s.resolve(p, "margin", "3px"), "3px");
        assert_eq!(s.resolve(p, "margin", ""), "0");
        assert_eq!(s.resolve(p, "made-up", ""), "");
    }

    #[test]
    fn test_inheriting_falls_back_to_builtin() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let s = sheet();
        let span = find(&doc, "span");
        assert_eq!(s.resolve(span, "color", "#123456"), "#000000");
        assert_eq!(s.resolve(span, "font-size", ""), "16px");
        assert_eq!(s.resolve(span, "direction", ""), "ltr");
    }

    #[test]
    fn test_combinators_and_conditions() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let mut s = sheet();
        s.add_rule("body.main > p:first-child", "padding", "1px").unwrap();
        s.add_rule("html span", "padding", "2px").unwrap();
        s.add_rule("body > span", "margin", "3px").unwrap();
        s.add_rule("[lang='en']", "margin", "4px").unwrap();
        s.add_rule("#top", "padding", "5px").unwrap();

        // h1 precedes the first p, so p is not a first child.
        assert_eq!(s.resolve(find(&doc, "p"), "padding", ""), "0");
        assert_eq!(s.resolve(find(&doc, "h1"), "padding", ""), "5px");
        assert_eq!(s.resolve(find(&doc, "span"), "padding", ""), "2px");
        assert_eq!(s.resolve(find(&doc, "span"), "margin", ""), "0");
        assert_eq!(s.resolve(find(&doc, "p"), "margin", ""), "4px");
    }

    #[test]
    fn test_add_css_blocks_and_comments() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let mut s = sheet();
        s.add_css(
            "/* base */ body { color: #ffffff; FONT-SIZE: 20px }\n\
             h1, p.a { text-align: center; }",
        )
        .unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.resolve(find(&doc, "h1"), "font-size", ""), "20px");
        assert_eq!(s.resolve(find(&doc, "p"), "text-align", ""), "center");
        assert_eq!(s.resolve(find(&doc, "h1"), "text-align", ""), "center");
    }

    #[test]
    fn test_add_css_errors_keep_sheet_unchanged() {
        let mut s = sheet();
        let err = s.add_css("p { color: red; } h1 { color }").unwrap_err();
        assert!(matches!(err, LayoutError::CssSyntax { offset: 23, .. }), "{err:?}");
        assert!(s.is_empty());

        let err = s.add_css("p { color: red }\nh1 { margin: }").unwrap_err();
        assert!(matches!(err, LayoutError::CssSyntax { offset: 22, .. }), "{err:?}");
        let err = s.add_css("p { color: red } h1").unwrap_err();
        assert!(matches!(err, LayoutError::CssSyntax { offset: 17, .. }), "{err:?}");
        let err = s.add_css("@media print { p { color: red } }").unwrap_err();
        assert!(matches!(err, LayoutError::CssSyntax { offset: 0, .. }), "{err:?}");
        assert!(matches!(
            s.add_css("p:hover { color: red }"),
            Err(LayoutError::InvalidSelector(_))
        ));
        assert!(matches!(
            s.add_css("{ color: red }"),
            Err(LayoutError::InvalidSelector(_))
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn test_add_css_follows_css_tokenizing() {
        let mut s = sheet();
        // An open block or comment is closed by the end of the text.
        s.add_css("p { color: red").unwrap();
        s.add_css("/* open").unwrap();
        s.add_css("p { ; margin: 1px;; }").unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_quoted_values_and_attribute_selectors() {
        let doc = XmlDocument::parse(
            r#"<html><body><p title="a,b">x</p><p title="}">y</p><p title="q">z</p></body></html>"#,
        )
        .unwrap();
        let mut s = sheet();
        s.add_css(r#"p { font-family: "A;B", sans }"#).unwrap();
        s.add_css(r#"p[title="a,b"] { color: red }"#).unwrap();
        s.add_css(r#"p[title="}"] { color: #0000ff }"#).unwrap();
        s.add_css(r#"p[ title = 'q' ] { margin: 2px }"#).unwrap();
        assert_eq!(s.len(), 4);

        let paragraphs = find(&doc, "body").children();
        assert_eq!(s.resolve(paragraphs[0], "font-family", ""), r#""A;B", sans"#);
        assert_eq!(s.resolve(paragraphs[0], "color", ""), "red");
        assert_eq!(s.resolve(paragraphs[1], "color", ""), "#0000ff");
        assert_eq!(s.resolve(paragraphs[2], "margin", ""), "2px");
        assert_eq!(s.resolve(paragraphs[2], "color", ""), "#000000");
    }

    #[test]
    fn test_add_rule_checks_values() {
        let mut s = sheet();
        let err = s.add_rule(" p.a ", "margin", "wide").unwrap_err();
        assert_eq!(err, LayoutError::invalid_value("margin", "wide", "p.a"));
        s.add_rule("p", "x-custom", "anything").unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_families_share_cache() {
        let mut s = sheet();
        s.add_font("sans", FontResource::new("a"));
        s.add_font("sans", FontResource::new("b"));
        assert_eq!(s.find_family("sans").map(|f| f.members().len()), Some(2));
        assert!(s.find_family("serif").is_none());
        assert!(s.font_cache().is_empty());
    }

    #[test]
    fn test_switches_flow_into_properties() {
        let mut s = sheet();
        assert!(s.use_optimizing_layouter() && s.hyphenate());
        s.set_use_optimizing_layouter(false);
        s.set_hyphenator(Some(Rc::new(quire_text::EnglishHyphenator)));
        let props = s.layout_properties();
        assert!(!props.optimize);
        assert!(props.hyphenate);
        assert!(props.hyphenator.is_some());
    }
}
