//! Markdown rendering for terminal UI

use crate::highlight::highlight_code;
use crate::markdown::{Block, Inline};
use crate::theme::Theme;
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// Render parsed markdown to styled lines no wider than `width`
pub fn render_blocks(blocks: &[Block], theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.extend(render_block(block, theme, width));
    }
    lines
}

fn render_block(block: &Block, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    match block {
        Block::Heading { level, content } => {
            let style = match *level {
                1 => theme
                    .accent_style()
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                2 => theme.accent_style().add_modifier(Modifier::BOLD),
                _ => theme.accent_style(),
            };
            wrap_spans(inline_spans(content, style, theme), width)
        }
        Block::Paragraph(content) => {
            wrap_spans(inline_spans(content, theme.base_style(), theme), width)
        }
        Block::List { start, items } => {
            let mut lines = Vec::new();
            for (n, item) in items.iter().enumerate() {
                let marker = match start {
                    Some(first) => format!("{}. ", first + n as u64),
                    None => "• ".to_string(),
                };
                let inner = render_blocks(item, theme, width.saturating_sub(marker.width()));
                lines.extend(prefix_lines(
                    inner,
                    Span::styled(marker.clone(), theme.dim_style()),
                    Span::raw(" ".repeat(marker.width())),
                ));
            }
            lines
        }
        Block::Quote(blocks) => {
            let inner = render_blocks(blocks, theme, width.saturating_sub(2));
            let bar = Span::styled("│ ", theme.dim_style());
            prefix_lines(inner, bar.clone(), bar)
                .into_iter()
                .map(|line| line.patch_style(Style::default().add_modifier(Modifier::ITALIC)))
                .collect()
        }
        Block::Code { language, code } => {
            render_code(language.as_deref().unwrap_or(""), code, theme, width)
        }
        Block::Table { header, rows } => render_table(header, rows, theme, width),
        Block::Rule => vec![Line::from(Span::styled(
            "─".repeat(width.max(1)),
            theme.dim_style(),
        ))],
    }
}

/// Render a code block: a language label followed by highlighted lines
pub fn render_code(language: &str, code: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let label = if language.is_empty() { "code" } else { language };
    let mut lines = vec![Line::from(Span::styled(
        format!("┌─ {}", label),
        theme.dim_style(),
    ))];

    let gutter = Span::styled("│ ", theme.dim_style());
    let fallback = theme.code_style();
    for line in highlight_code(code.trim_end_matches('\n'), language, theme.dark, fallback) {
        let wrapped = wrap_spans(line.spans, width.saturating_sub(2));
        lines.extend(prefix_lines(wrapped, gutter.clone(), gutter.clone()));
    }
    lines.push(Line::from(Span::styled("└─", theme.dim_style())));
    lines
}

fn render_table(
    header: &[Vec<Inline>],
    rows: &[Vec<Vec<Inline>>],
    theme: &Theme,
    width: usize,
) -> Vec<Line<'static>> {
    let header: Vec<String> = header.iter().map(|c| Inline::plain_text(c)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|c| Inline::plain_text(c)).collect())
        .collect();

    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&header).chain(rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let format_row = |row: &[String]| -> String {
        let cells: Vec<String> = (0..columns)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{}{}", cell, " ".repeat(widths[i].saturating_sub(cell.width())))
            })
            .collect();
        format!("│ {} │", cells.join(" │ "))
    };

    let mut lines = Vec::new();
    if !header.is_empty() {
        lines.extend(wrap_spans(
            vec![Span::styled(
                format_row(&header),
                theme.base_style().add_modifier(Modifier::BOLD),
            )],
            width,
        ));
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        lines.extend(wrap_spans(
            vec![Span::styled(format!("├─{}─┤", rule.join("─┼─")), theme.dim_style())],
            width,
        ));
    }
    for row in &rows {
        lines.extend(wrap_spans(
            vec![Span::styled(format_row(row), theme.base_style())],
            width,
        ));
    }
    lines
}

/// Flatten inline nodes into styled spans
fn inline_spans(inlines: &[Inline], base: Style, theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) => spans.push(Span::styled(t.clone(), base)),
            Inline::Strong(c) => {
                spans.extend(inline_spans(c, base.add_modifier(Modifier::BOLD), theme))
            }
            Inline::Emphasis(c) => {
                spans.extend(inline_spans(c, base.add_modifier(Modifier::ITALIC), theme))
            }
            Inline::Strike(c) => spans.extend(inline_spans(
                c,
                base.add_modifier(Modifier::CROSSED_OUT),
                theme,
            )),
            Inline::Code(t) => spans.push(Span::styled(
                format!("`{}`", t),
                theme.code_style().add_modifier(Modifier::BOLD),
            )),
            Inline::Link { content, url } => {
                spans.extend(inline_spans(content, theme.link_style(), theme));
                let label = Inline::plain_text(content);
                if !url.is_empty() && label != *url {
                    spans.push(Span::styled(format!(" ({})", url), theme.dim_style()));
                }
            }
            Inline::Break => spans.push(Span::raw("\n")),
        }
    }
    spans
}

/// Word-wrap spans to `width` columns, keeping styles. Explicit `\n` in a
/// span starts a new line. Words longer than a line are split by character.
pub fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    fn push_piece(current: &mut Vec<Span<'static>>, text: &str, style: Style) {
        if let Some(last) = current.last_mut() {
            if last.style == style {
                last.content.to_mut().push_str(text);
                return;
            }
        }
        current.push(Span::styled(text.to_string(), style));
    }

    for span in spans {
        let style = span.style;
        for (n, segment) in span.content.split('\n').enumerate() {
            if n > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            for word in segment.split_inclusive(' ') {
                let word_width = word.trim_end_matches(' ').width();
                if used > 0 && used + word_width > width {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    used = 0;
                    if word.trim().is_empty() {
                        continue;
                    }
                }
                if word_width > width {
                    let mut chunk = String::new();
                    for c in word.chars() {
                        let cw = c.to_string().width();
                        if used + cw > width && used > 0 {
                            push_piece(&mut current, &chunk, style);
                            chunk.clear();
                            lines.push(Line::from(std::mem::take(&mut current)));
                            used = 0;
                        }
                        chunk.push(c);
                        used += cw;
                    }
                    push_piece(&mut current, &chunk, style);
                } else {
                    push_piece(&mut current, word, style);
                    used += word.width();
                }
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

/// Prefix the first line with `first` and the rest with `rest`
fn prefix_lines(
    lines: Vec<Line<'static>>,
    first: Span<'static>,
    rest: Span<'static>,
) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let mut spans = vec![if i == 0 { first.clone() } else { rest.clone() }];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}
