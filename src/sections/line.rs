// src/sections/line.rs
use serde::Serialize;

/// Presentation class of a single body line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LineKind {
    Bullet { text: String },
    Numbered { number: String, text: String },
    Plain { text: String },
}

impl LineKind {
    pub fn text(&self) -> &str {
        match self {
            LineKind::Bullet { text }
            | LineKind::Numbered { text, .. }
            | LineKind::Plain { text } => text,
        }
    }
}

pub fn render_line(line: &str) -> LineKind {
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('•'))
    {
        return LineKind::Bullet {
            text: rest.trim().to_string(),
        };
    }

    let digits = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);

    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix('.') {
            return LineKind::Numbered {
                number: trimmed[..digits].to_string(),
                text: rest.to_string(),
            };
        }
    }

    LineKind::Plain {
        text: line.to_string(),
    }
}
