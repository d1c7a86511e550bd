use crate::block::{Block, Cell, Span};
use crate::inline;

/// Parse markdown text into a list of blocks.
///
/// Never fails: any line that matches no known shape becomes a paragraph.
pub fn parse(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for line in markdown.lines() {
        process_line(line.trim_start(), &mut state, &mut blocks);
    }
    state.flush(&mut blocks);

    blocks
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

#[derive(Default)]
struct ParseState {
    // Open list: its kind and the items seen so far
    list: Option<(ListKind, Vec<Vec<Span>>)>,
    // Open table: every data row, header first
    table_rows: Vec<Vec<Cell>>,
}

impl ParseState {
    fn flush_list(&mut self, blocks: &mut Vec<Block>) {
        if let Some((kind, items)) = self.list.take() {
            blocks.push(match kind {
                ListKind::Bullet => Block::BulletList { items },
                ListKind::Numbered => Block::NumberedList { items },
            });
        }
    }

    fn flush_table(&mut self, blocks: &mut Vec<Block>) {
        let mut rows = std::mem::take(&mut self.table_rows).into_iter();
        if let Some(header) = rows.next() {
            blocks.push(Block::Table {
                header,
                rows: rows.collect(),
            });
        }
    }

    fn flush(&mut self, blocks: &mut Vec<Block>) {
        self.flush_list(blocks);
        self.flush_table(blocks);
    }

    fn push_item(&mut self, kind: ListKind, item: Vec<Span>, blocks: &mut Vec<Block>) {
        self.flush_table(blocks);
        if let Some((open, _)) = &self.list {
            if *open != kind {
                self.flush_list(blocks);
            }
        }
        self.list
            .get_or_insert_with(|| (kind, Vec::new()))
            .1
            .push(item);
    }
}

/// `line` keeps its trailing whitespace so that `## ` and `- ` still read as
/// an empty heading and an empty item.
fn process_line(line: &str, state: &mut ParseState, blocks: &mut Vec<Block>) {
    let trimmed = line.trim_end();
    if trimmed.is_empty() {
        state.flush(blocks);
        return;
    }

    if trimmed.starts_with('|') {
        state.flush_list(blocks);
        if !is_table_separator(trimmed) {
            state.table_rows.push(split_row(trimmed));
        }
        return;
    }

    if let Some((level, text)) = heading(line) {
        state.flush(blocks);
        blocks.push(Block::Heading {
            level,
            spans: inline::format(text),
        });
        return;
    }

    if let Some(text) = bullet_item(line) {
        state.push_item(ListKind::Bullet, inline::format(text), blocks);
        return;
    }

    if let Some(text) = numbered_item(line) {
        state.push_item(ListKind::Numbered, inline::format(text), blocks);
        return;
    }

    state.flush(blocks);
    if is_rule(trimmed) {
        blocks.push(Block::Rule);
    } else {
        blocks.push(Block::Paragraph {
            spans: inline::format(trimmed),
        });
    }
}

/// Longest prefix first, so `#### ` is never read as `# `.
fn heading(line: &str) -> Option<(u8, &str)> {
    const PREFIXES: [(&str, u8); 4] = [("#### ", 4), ("### ", 3), ("## ", 2), ("# ", 1)];
    PREFIXES
        .iter()
        .find_map(|(prefix, level)| line.strip_prefix(prefix).map(|rest| (*level, rest.trim())))
}

/// `-` or `*` followed by at least one space.
fn bullet_item(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(['-', '*'])?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// One or more digits, a dot, then at least one space.
fn numbered_item(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3 && (line.bytes().all(|b| b == b'-') || line.bytes().all(|b| b == b'*'))
}

/// `|---|:---:|` style lines between header and body.
fn is_table_separator(line: &str) -> bool {
    line.len() >= 3
        && line.ends_with('|')
        && line[1..line.len() - 1]
            .chars()
            .all(|c| c.is_whitespace() || matches!(c, '-' | ':' | '|'))
}

fn split_row(line: &str) -> Vec<Cell> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner
        .split('|')
        .map(|cell| inline::format(cell.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::plain_text;

    fn texts(cells: &[Cell]) -> Vec<String> {
        cells.iter().map(|c| plain_text(c)).collect()
    }

    #[test]
    fn end_to_end_scenario() {
        let md = "## Executive Summary\n\nRicavi **197.250€** in crescita.\n\n- Punto forte uno\n- Punto forte due\n\n| A | B |\n|---|---|\n| 1 | 2 |";
        let blocks = parse(md);
        assert_eq!(blocks.len(), 4);

        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 2,
                spans: vec![Span::plain("Executive Summary")],
            }
        );

        match &blocks[1] {
            Block::Paragraph { spans } => {
                assert!(spans.contains(&Span::bold("197.250€")));
                assert_eq!(plain_text(spans), "Ricavi 197.250€ in crescita.");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }

        match &blocks[2] {
            Block::BulletList { items } => assert_eq!(items.len(), 2),
            other => panic!("expected bullet list, got {other:?}"),
        }

        match &blocks[3] {
            Block::Table { header, rows } => {
                assert_eq!(texts(header), ["A", "B"]);
                assert_eq!(rows.len(), 1);
                assert_eq!(texts(&rows[0]), ["1", "2"]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn heading_levels_longest_prefix() {
        let blocks = parse("# Uno\n## Due\n### Tre\n#### Quattro");
        let levels: Vec<u8> = blocks
            .iter()
            .map(|b| match b {
                Block::Heading { level, .. } => *level,
                _ => 0,
            })
            .collect();
        assert_eq!(levels, [1, 2, 3, 4]);
    }

    #[test]
    fn hash_without_space_is_paragraph() {
        assert!(matches!(parse("#hashtag")[0], Block::Paragraph { .. }));
        assert!(matches!(parse("##### Cinque")[0], Block::Paragraph { .. }));
    }

    #[test]
    fn bullet_then_numbered_are_distinct_lists() {
        let blocks = parse("- uno\n1. primo");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], Block::BulletList { .. }));
        assert!(matches!(blocks[1], Block::NumberedList { .. }));
    }

    #[test]
    fn numbered_source_labels_are_dropped() {
        let blocks = parse("3. terzo\n7. settimo");
        match &blocks[0] {
            Block::NumberedList { items } => {
                assert_eq!(plain_text(&items[0]), "terzo");
                assert_eq!(plain_text(&items[1]), "settimo");
            }
            other => panic!("expected numbered list, got {other:?}"),
        }
    }

    #[test]
    fn star_bullets_and_bold_paragraphs() {
        let blocks = parse("* voce\n**Nota** importante");
        assert!(matches!(blocks[0], Block::BulletList { .. }));
        assert!(matches!(blocks[1], Block::Paragraph { .. }));
    }

    #[test]
    fn rules() {
        assert_eq!(parse("---"), vec![Block::Rule]);
        assert_eq!(parse("*****"), vec![Block::Rule]);
        assert!(matches!(parse("--")[0], Block::Paragraph { .. }));
    }

    #[test]
    fn table_row_count_excludes_separators() {
        let md = "| Voce | 2024 |\n|:---|---:|\n| Ricavi | 197.250 |\n| EBITDA | -98.912 |";
        match &parse(md)[0] {
            Block::Table { rows, .. } => assert_eq!(1 + rows.len(), 4 - 1),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn table_closed_by_list() {
        let blocks = parse("| A |\n| 1 |\n- dopo");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], Block::Table { .. }));
        assert!(matches!(blocks[1], Block::BulletList { .. }));
    }

    #[test]
    fn list_closed_by_table() {
        let blocks = parse("- prima\n| A |");
        assert!(matches!(blocks[0], Block::BulletList { .. }));
        assert!(matches!(blocks[1], Block::Table { .. }));
    }

    #[test]
    fn separator_only_table_emits_nothing() {
        assert!(parse("|---|---|").is_empty());
    }

    #[test]
    fn blank_lines_emit_nothing() {
        assert!(parse("\n\n   \n").is_empty());
        let blocks = parse("- a\n\n- b");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn order_follows_source() {
        let md = "Intro\n# Titolo\n- x\n| a |\n---\n1. y";
        let kinds: Vec<&str> = parse(md)
            .iter()
            .map(|b| match b {
                Block::Paragraph { .. } => "p",
                Block::Heading { .. } => "h",
                Block::BulletList { .. } => "ul",
                Block::Table { .. } => "t",
                Block::Rule => "hr",
                Block::NumberedList { .. } => "ol",
            })
            .collect();
        assert_eq!(kinds, ["p", "h", "ul", "t", "hr", "ol"]);
    }

    #[test]
    fn bare_markers_are_empty_heading_and_item() {
        let blocks = parse("## \n- \nTesto  ");
        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            Block::Heading { level, spans } => {
                assert_eq!(*level, 2);
                assert_eq!(plain_text(spans), "");
            }
            other => panic!("expected heading, got {other:?}"),
        }
        match &blocks[1] {
            Block::BulletList { items } => {
                assert_eq!(items.len(), 1);
                assert_eq!(plain_text(&items[0]), "");
            }
            other => panic!("expected bullet list, got {other:?}"),
        }
        match &blocks[2] {
            Block::Paragraph { spans } => assert_eq!(plain_text(spans), "Testo"),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn trailing_spaces_keep_table_separators() {
        let blocks = parse("| a | b |  \n|---|---|   \n| 1 | 2 |");
        match &blocks[0] {
            Block::Table { header, rows } => {
                assert_eq!(texts(header), ["a", "b"]);
                assert_eq!(rows.len(), 1);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn indented_and_crlf_lines() {
        let blocks = parse("  - a\r\n  - b\r\n");
        match &blocks[0] {
            Block::BulletList { items } => assert_eq!(items.len(), 2),
            other => panic!("expected bullet list, got {other:?}"),
        }
    }
}
