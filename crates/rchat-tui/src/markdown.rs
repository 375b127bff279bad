//! Markdown to an abstract node tree
//!
//! Replies are parsed once into [`Block`]s, and each node kind is rendered
//! explicitly by [`crate::widgets::markdown`]. Raw HTML never becomes markup:
//! it is kept as literal text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

/// Block-level node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// `start` is the first number of an ordered list, `None` for bullets
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Quote(Vec<Block>),
    Code {
        language: Option<String>,
        code: String,
    },
    Table {
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Rule,
}

/// Inline span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strike(Vec<Inline>),
    Code(String),
    Link { content: Vec<Inline>, url: String },
    Break,
}

impl Inline {
    /// Text with all formatting removed
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(t) | Inline::Code(t) => out.push_str(t),
                Inline::Strong(c) | Inline::Emphasis(c) | Inline::Strike(c) => {
                    out.push_str(&Inline::plain_text(c))
                }
                Inline::Link { content, .. } => out.push_str(&Inline::plain_text(content)),
                Inline::Break => out.push(' '),
            }
        }
        out
    }
}

/// Parse markdown into blocks
pub fn parse(text: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut events = Parser::new_ext(text, options);
    parse_blocks(&mut events)
}

fn is_block_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading { .. }
            | Tag::BlockQuote(_)
            | Tag::CodeBlock(_)
            | Tag::HtmlBlock
            | Tag::List(_)
            | Tag::Item
            | Tag::Table(_)
            | Tag::FootnoteDefinition(_)
    )
}

/// Consume block events until the enclosing container ends.
/// Loose inline content (tight list items) becomes a paragraph.
fn parse_blocks<'a, I: Iterator<Item = Event<'a>>>(events: &mut I) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut loose: Vec<Inline> = Vec::new();

    while let Some(event) = events.next() {
        match event {
            Event::End(_) => break,
            Event::Start(tag) if is_block_tag(&tag) => {
                flush_loose(&mut loose, &mut blocks);
                if let Some(block) = parse_block(tag, events) {
                    blocks.push(block);
                } else {
                    // Containers without a node of their own contribute their children.
                    blocks.extend(parse_blocks(events));
                }
            }
            Event::Rule => {
                flush_loose(&mut loose, &mut blocks);
                blocks.push(Block::Rule);
            }
            other => push_inline(other, events, &mut loose),
        }
    }
    flush_loose(&mut loose, &mut blocks);
    blocks
}

fn flush_loose(loose: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    if !loose.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(loose)));
    }
}

fn parse_block<'a, I: Iterator<Item = Event<'a>>>(tag: Tag<'a>, events: &mut I) -> Option<Block> {
    let block = match tag {
        Tag::Paragraph | Tag::HtmlBlock => Block::Paragraph(parse_inlines(events)),
        Tag::Heading { level, .. } => Block::Heading {
            level: level as u8,
            content: parse_inlines(events),
        },
        Tag::BlockQuote(_) => Block::Quote(parse_blocks(events)),
        Tag::CodeBlock(kind) => {
            let language = match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
                CodeBlockKind::Indented => None,
            };
            let mut code = String::new();
            for event in events.by_ref() {
                match event {
                    Event::Text(t) => code.push_str(&t),
                    Event::End(_) => break,
                    _ => {}
                }
            }
            Block::Code { language, code }
        }
        Tag::List(start) => {
            let mut items = Vec::new();
            while let Some(event) = events.next() {
                match event {
                    Event::Start(Tag::Item) => items.push(parse_blocks(events)),
                    Event::End(_) => break,
                    _ => {}
                }
            }
            Block::List { start, items }
        }
        Tag::Table(_) => {
            let mut header = Vec::new();
            let mut rows = Vec::new();
            while let Some(event) = events.next() {
                match event {
                    Event::Start(Tag::TableHead) => header = parse_cells(events),
                    Event::Start(Tag::TableRow) => rows.push(parse_cells(events)),
                    Event::End(_) => break,
                    _ => {}
                }
            }
            Block::Table { header, rows }
        }
        _ => return None,
    };
    Some(block)
}

fn parse_cells<'a, I: Iterator<Item = Event<'a>>>(events: &mut I) -> Vec<Vec<Inline>> {
    let mut cells = Vec::new();
    while let Some(event) = events.next() {
        match event {
            Event::Start(Tag::TableCell) => cells.push(parse_inlines(events)),
            Event::End(_) => break,
            _ => {}
        }
    }
    cells
}

fn parse_inlines<'a, I: Iterator<Item = Event<'a>>>(events: &mut I) -> Vec<Inline> {
    let mut inlines = Vec::new();
    while let Some(event) = events.next() {
        if let Event::End(_) = event {
            break;
        }
        push_inline(event, events, &mut inlines);
    }
    inlines
}

fn push_inline<'a, I: Iterator<Item = Event<'a>>>(
    event: Event<'a>,
    events: &mut I,
    out: &mut Vec<Inline>,
) {
    match event {
        Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => push_text(out, &t),
        Event::Code(t) => out.push(Inline::Code(t.into_string())),
        Event::SoftBreak => push_text(out, " "),
        Event::HardBreak => out.push(Inline::Break),
        Event::Start(Tag::Strong) => out.push(Inline::Strong(parse_inlines(events))),
        Event::Start(Tag::Emphasis) => out.push(Inline::Emphasis(parse_inlines(events))),
        Event::Start(Tag::Strikethrough) => out.push(Inline::Strike(parse_inlines(events))),
        Event::Start(Tag::Link { dest_url, .. }) | Event::Start(Tag::Image { dest_url, .. }) => {
            out.push(Inline::Link {
                content: parse_inlines(events),
                url: dest_url.into_string(),
            })
        }
        Event::Start(_) => out.extend(parse_inlines(events)),
        _ => {}
    }
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}
