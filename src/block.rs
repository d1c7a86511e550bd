/// Inline run of text with formatting
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: false,
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: true,
        }
    }
}

/// A table cell is a run of spans
pub type Cell = Vec<Span>;

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    BulletList {
        items: Vec<Vec<Span>>,
    },
    /// Items are renumbered from 1 when rendered; source numerals are dropped.
    NumberedList {
        items: Vec<Vec<Span>>,
    },
    Table {
        header: Vec<Cell>,
        rows: Vec<Vec<Cell>>,
    },
    Rule,
    Paragraph {
        spans: Vec<Span>,
    },
}

impl Block {
    /// Heading text with markup stripped, for level-2 headings only.
    pub fn section_title(&self) -> Option<String> {
        match self {
            Block::Heading { level: 2, spans } => Some(plain_text(spans)),
            _ => None,
        }
    }
}

/// Concatenate the visible text of a span sequence.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// True when a cell reads as a figure (amounts, percentages, ratios) and
/// should be right-aligned. Cells are never re-parsed as numbers.
pub fn looks_numeric(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/d") {
        return false;
    }
    let mut digits = 0;
    for ch in text.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' | ',' | '%' | '€' | '$' | '+' | '-' | '−' | '/' | 'x' | ' ' | '\u{a0}' => {}
            _ => return false,
        }
    }
    digits > 0
}
