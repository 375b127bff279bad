//! Syntax highlighting for code blocks

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::sync::OnceLock;
use syntect::{
    easy::HighlightLines,
    highlighting::{FontStyle, Theme as SyntaxTheme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

const DARK_THEME: &str = "base16-ocean.dark";
const LIGHT_THEME: &str = "InspiredGitHub";

struct Assets {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

fn assets() -> &'static Assets {
    static ASSETS: OnceLock<Assets> = OnceLock::new();
    ASSETS.get_or_init(|| Assets {
        syntaxes: SyntaxSet::load_defaults_newlines(),
        themes: ThemeSet::load_defaults(),
    })
}

/// Name of the syntect theme used for a display mode
pub fn theme_name(dark_mode: bool) -> &'static str {
    if dark_mode { DARK_THEME } else { LIGHT_THEME }
}

fn syntax_theme(dark_mode: bool) -> Option<&'static SyntaxTheme> {
    assets().themes.themes.get(theme_name(dark_mode))
}

fn find_syntax(language: &str) -> &'static SyntaxReference {
    let syntaxes = &assets().syntaxes;
    syntaxes
        .find_syntax_by_token(language)
        .or_else(|| syntaxes.find_syntax_by_extension(language))
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
}

/// Whether a language tag maps to a known grammar
pub fn is_known_language(language: &str) -> bool {
    let syntaxes = &assets().syntaxes;
    syntaxes.find_syntax_by_token(language).is_some()
        || syntaxes.find_syntax_by_extension(language).is_some()
}

/// Highlight `code` line by line. Unknown languages and highlighter
/// failures fall back to `fallback` styling; no text is dropped.
pub fn highlight_code(code: &str, language: &str, dark_mode: bool, fallback: Style) -> Vec<Line<'static>> {
    let Some(theme) = syntax_theme(dark_mode) else {
        return plain_lines(code, fallback);
    };
    let mut highlighter = HighlightLines::new(find_syntax(language), theme);
    let syntaxes = &assets().syntaxes;

    let mut lines = Vec::new();
    for line in LinesWithEndings::from(code) {
        let spans = match highlighter.highlight_line(line, syntaxes) {
            Ok(ranges) => ranges
                .into_iter()
                .map(|(style, text)| {
                    Span::styled(
                        text.trim_end_matches(['\n', '\r']).to_string(),
                        convert_style(style),
                    )
                })
                .filter(|span| !span.content.is_empty())
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "highlighting failed, using plain text");
                vec![Span::styled(
                    line.trim_end_matches(['\n', '\r']).to_string(),
                    fallback,
                )]
            }
        };
        lines.push(Line::from(spans));
    }
    lines
}

fn plain_lines(code: &str, style: Style) -> Vec<Line<'static>> {
    code.lines()
        .map(|l| Line::from(Span::styled(l.to_string(), style)))
        .collect()
}

fn convert_style(style: syntect::highlighting::Style) -> Style {
    let fg = style.foreground;
    let mut out = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}
