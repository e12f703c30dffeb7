//! Parsing of the backend's response markup into a small document model.
//!
//! Responses are trusted HTML fragments (headings, paragraphs, lists,
//! emphasis and links). Anything else is reduced to its text. Highlighting
//! works on this model instead of on raw markup, so tag names and attribute
//! values can never be tagged.

use crate::highlight::Severity;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub strong: bool,
    pub emphasis: bool,
    pub link: Option<String>,
}

/// A run of text sharing the same marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub marks: Marks,
    /// Set when the run is a recognised side-effect term.
    pub term: Option<Severity>,
}

impl Inline {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
            term: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem { ordered: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub inlines: Vec<Inline>,
}

impl Block {
    pub fn text(&self) -> String {
        self.inlines.iter().map(|i| i.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Serialize back to markup. Consecutive items of the same list kind
    /// share one `<ul>` or `<ol>`.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        let mut open_list: Option<bool> = None;

        for block in &self.blocks {
            let list = match block.kind {
                BlockKind::ListItem { ordered } => Some(ordered),
                _ => None,
            };
            if list != open_list {
                if let Some(ordered) = open_list {
                    out.push_str(list_tag(ordered, true));
                }
                if let Some(ordered) = list {
                    out.push_str(list_tag(ordered, false));
                }
                open_list = list;
            }

            let (open, close) = match block.kind {
                BlockKind::Heading(level) => (format!("<h{level}>"), format!("</h{level}>")),
                BlockKind::Paragraph => ("<p>".to_string(), "</p>".to_string()),
                BlockKind::ListItem { .. } => ("<li>".to_string(), "</li>".to_string()),
            };
            out.push_str(&open);
            for inline in &block.inlines {
                write_inline(&mut out, inline);
            }
            out.push_str(&close);
        }

        if let Some(ordered) = open_list {
            out.push_str(list_tag(ordered, true));
        }
        out
    }

    /// Readable text for non-terminal output: one block per line, bullets or
    /// numbers for list items, link targets in parentheses.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.blocks.len());
        let mut number = 0;
        for block in &self.blocks {
            let prefix = match block.kind {
                BlockKind::ListItem { ordered: true } => {
                    number += 1;
                    format!("{number}. ")
                }
                BlockKind::ListItem { ordered: false } => {
                    number = 0;
                    "• ".to_string()
                }
                _ => {
                    number = 0;
                    String::new()
                }
            };
            // Continuation lines line up with the item text
            let break_with = format!("\n{}", " ".repeat(prefix.chars().count()));

            let mut line = prefix;
            for inline in &block.inlines {
                line.push_str(&inline.text.replace('\n', &break_with));
                if let Some(href) = &inline.marks.link {
                    if href != &inline.text {
                        line.push_str(&format!(" ({href})"));
                    }
                }
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

fn list_tag(ordered: bool, closing: bool) -> &'static str {
    match (ordered, closing) {
        (false, false) => "<ul>",
        (false, true) => "</ul>",
        (true, false) => "<ol>",
        (true, true) => "</ol>",
    }
}

fn write_inline(out: &mut String, inline: &Inline) {
    let mut html = escape_html(&inline.text).replace('\n', "<br>");
    if let Some(severity) = inline.term {
        html = format!("<span class=\"{}\">{html}</span>", severity.css_class());
    }
    if inline.marks.emphasis {
        html = format!("<em>{html}</em>");
    }
    if inline.marks.strong {
        html = format!("<strong>{html}</strong>");
    }
    if let Some(href) = &inline.marks.link {
        html = format!(
            "<a href=\"{}\" target=\"_blank\">{html}</a>",
            escape_html(href)
        );
    }
    out.push_str(&html);
}

/// Escape text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    /// Doctype, processing instruction or anything else we ignore.
    Other,
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(start) = rest.find('<') else {
            tokens.push(Token::Text(rest));
            break;
        };
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        rest = &rest[start..];

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        match parse_tag(rest) {
            Some((token, len)) => {
                tokens.push(token);
                rest = &rest[len..];
            }
            None => {
                // A stray '<' such as "a < b" is just text
                tokens.push(Token::Text("<"));
                rest = &rest[1..];
            }
        }
    }

    tokens
}

/// Parse the tag at the start of `s` (which begins with '<'), returning the
/// token and the number of bytes it spans.
fn parse_tag(s: &str) -> Option<(Token<'static>, usize)> {
    let mut quote: Option<char> = None;
    let mut end = None;
    for (i, ch) in s.char_indices().skip(1) {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => {
                end = Some(i);
                break;
            }
            None if ch == '<' => return None,
            None => {}
        }
    }
    let end = end?;
    let inner = &s[1..end];
    let len = end + 1;

    if inner.starts_with('!') || inner.starts_with('?') {
        return Some((Token::Other, len));
    }

    if let Some(closing) = inner.strip_prefix('/') {
        let name = tag_name(closing.trim_start())?;
        return Some((Token::Close { name }, len));
    }

    let name = tag_name(inner)?;
    let self_closing = inner.trim_end().ends_with('/');
    let attrs = parse_attrs(&inner[name.len()..]);
    Some((
        Token::Open {
            name,
            attrs,
            self_closing,
        },
        len,
    ))
}

fn tag_name(s: &str) -> Option<String> {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name: String = s
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    Some(name.to_ascii_lowercase())
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == '/') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                break;
            }
            name.push(c);
            chars.next();
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            match chars.peek().copied() {
                Some(q @ ('"' | '\'')) => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }

        // A lone '=' has no name
        if name.is_empty() {
            continue;
        }
        attrs.push((name.to_ascii_lowercase(), decode_entities(&value)));
    }

    attrs
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Severity of a `<span>` emitted by an earlier highlighting pass, if any.
fn span_severity(attrs: &[(String, String)]) -> Option<Severity> {
    let class = attr(attrs, "class")?;
    let mut classes = class.split_whitespace();
    if !classes.clone().any(|c| c == "side-effect-tag") {
        return None;
    }
    if classes.any(|c| c == "severe-tag") {
        Some(Severity::Severe)
    } else {
        Some(Severity::Common)
    }
}

fn is_unmarked(marks: &Marks, term: Option<Severity>) -> bool {
    *marks == Marks::default() && term.is_none()
}

struct Builder {
    blocks: Vec<Block>,
    kind: BlockKind,
    inlines: Vec<Inline>,
    pending_space: bool,
    strong: usize,
    emphasis: usize,
    links: Vec<Option<String>>,
    spans: Vec<Option<Severity>>,
    /// Open lists, innermost last; true for `<ol>`.
    lists: Vec<bool>,
    skipping: Option<String>,
}

impl Builder {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            kind: BlockKind::Paragraph,
            inlines: Vec::new(),
            pending_space: false,
            strong: 0,
            emphasis: 0,
            links: Vec::new(),
            spans: Vec::new(),
            lists: Vec::new(),
            skipping: None,
        }
    }

    fn marks(&self) -> Marks {
        Marks {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            link: self.links.iter().rev().find_map(Clone::clone),
        }
    }

    fn term(&self) -> Option<Severity> {
        self.spans.iter().rev().find_map(|s| *s)
    }

    fn flush(&mut self) {
        if !self.inlines.is_empty() {
            self.blocks.push(Block {
                kind: self.kind,
                inlines: std::mem::take(&mut self.inlines),
            });
        }
        self.kind = BlockKind::Paragraph;
        self.pending_space = false;
    }

    fn start(&mut self, kind: BlockKind) {
        self.flush();
        self.kind = kind;
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        for (i, piece) in paragraphs(&decoded).into_iter().enumerate() {
            if i > 0 {
                self.flush();
            }
            self.words(piece);
        }
    }

    /// Append text with whitespace runs collapsed to one space, dropping
    /// leading whitespace at the start of a block.
    fn words(&mut self, text: &str) {
        let marks = self.marks();
        let term = self.term();
        let mut out = String::new();
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if self.pending_space {
                if !out.is_empty() {
                    out.push(' ');
                } else if !self.inlines.is_empty() && !self.at_line_start() {
                    self.separate(&marks, term, &mut out);
                }
                self.pending_space = false;
            }
            out.push(ch);
        }
        if out.is_empty() {
            return;
        }

        match self.inlines.last_mut() {
            Some(last) if last.marks == marks && last.term == term => last.text.push_str(&out),
            _ => self.inlines.push(Inline {
                text: out,
                marks,
                term,
            }),
        }
    }

    /// A space between two runs goes to whichever side is unmarked, so
    /// terms and links never start or end with whitespace.
    fn separate(&mut self, marks: &Marks, term: Option<Severity>, out: &mut String) {
        if is_unmarked(marks, term) {
            out.push(' ');
            return;
        }
        match self.inlines.last_mut() {
            Some(last) if is_unmarked(&last.marks, last.term) => last.text.push(' '),
            _ => self.inlines.push(Inline::plain(" ")),
        }
    }

    fn at_line_start(&self) -> bool {
        self.inlines.last().is_some_and(|last| last.text.ends_with('\n'))
    }

    /// `<br>` stays inside the current block as a newline in an unmarked run.
    fn line_break(&mut self) {
        self.pending_space = false;
        if self.inlines.is_empty() {
            return;
        }
        match self.inlines.last_mut() {
            Some(last) if is_unmarked(&last.marks, last.term) => {
                let trimmed = last.text.trim_end_matches(' ').len();
                last.text.truncate(trimmed);
                last.text.push('\n');
            }
            _ => self.inlines.push(Inline::plain("\n")),
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)], self_closing: bool) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(3);
                self.start(BlockKind::Heading(level));
            }
            "li" => {
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.start(BlockKind::ListItem { ordered });
            }
            "ul" | "ol" => {
                self.flush();
                if !self_closing {
                    self.lists.push(name == "ol");
                }
            }
            "br" => self.line_break(),
            "p" | "div" | "section" | "blockquote" | "table" | "tr" | "pre" | "hr" => {
                self.flush()
            }
            "strong" | "b" if !self_closing => self.strong += 1,
            "em" | "i" if !self_closing => self.emphasis += 1,
            "a" if !self_closing => self.links.push(attr(attrs, "href").map(str::to_string)),
            "span" if !self_closing => self.spans.push(span_severity(attrs)),
            "script" | "style" if !self_closing => self.skipping = Some(name.to_string()),
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "p" | "div" | "section"
            | "blockquote" | "table" | "tr" | "pre" => self.flush(),
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
            }
            "strong" | "b" => self.strong = self.strong.saturating_sub(1),
            "em" | "i" => self.emphasis = self.emphasis.saturating_sub(1),
            "a" => {
                self.links.pop();
            }
            "span" => {
                self.spans.pop();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Document {
        self.flush();
        for block in &mut self.blocks {
            if let Some(last) = block.inlines.last_mut() {
                let trimmed = last.text.trim_end().len();
                last.text.truncate(trimmed);
            }
            block.inlines.retain(|i| !i.text.is_empty());
        }
        self.blocks.retain(|b| !b.inlines.is_empty());
        Document {
            blocks: self.blocks,
        }
    }
}

/// Split on blank lines. Markup normally separates blocks with tags, but
/// model output often mixes in bare paragraphs.
fn paragraphs(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            while j < bytes.len() && matches!(bytes[j], b' ' | b'\t' | b'\r') {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'\n' {
                pieces.push(&text[start..i]);
                // Swallow any further blank lines
                let mut k = j + 1;
                while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                start = k;
                i = k;
                continue;
            }
        }
        i += 1;
    }
    pieces.push(&text[start..]);
    pieces
}

/// Parse response markup into a document.
pub fn parse(markup: &str) -> Document {
    let mut builder = Builder::new();

    for token in tokenize(markup) {
        if let Some(skipping) = &builder.skipping {
            if matches!(&token, Token::Close { name } if name == skipping) {
                builder.skipping = None;
            }
            continue;
        }

        match token {
            Token::Text(text) => builder.text(text),
            Token::Open {
                name,
                attrs,
                self_closing,
            } => builder.open(&name, &attrs, self_closing),
            Token::Close { name } => builder.close(&name),
            Token::Other => {}
        }
    }

    builder.finish()
}
