use crate::config::Config;
use crate::native::{Align, CellNode, NativeDocument, Node, Run, TableNode, TextStyle};
use crate::plan::{PageTemplate, Piece};

/// Lower a native document to Typst markup.
pub fn document_to_typst(doc: &NativeDocument, config: &Config) -> String {
    let mut out = String::new();
    preamble(doc, config, &mut out);
    nodes_to_typst(&doc.content, doc, &mut out);
    out
}

fn preamble(doc: &NativeDocument, config: &Config, out: &mut String) {
    let info = &doc.info;
    out.push_str("#set document(title: ");
    string_literal(&info.title, out);
    out.push_str(", author: ");
    string_literal(&info.author, out);
    out.push_str(", description: ");
    string_literal(&info.subject, out);
    out.push_str(", keywords: (");
    for keyword in &info.keywords {
        string_literal(keyword, out);
        out.push_str(", ");
    }
    out.push_str("))\n");

    let page = &config.page;
    let palette = &config.palette;
    out.push_str("#set page(paper: ");
    string_literal(&page.paper, out);
    out.push_str(&format!(
        ", margin: (x: {}pt, y: {}pt),\n",
        page.margin_x, page.margin_y
    ));
    out.push_str("  header: ");
    furniture_line(&doc.furniture.header, config, out);
    out.push_str(",\n  footer: ");
    furniture_line(&doc.furniture.footer, config, out);
    out.push_str(",\n)\n");

    out.push_str("#set text(font: ");
    string_literal(&config.font.family, out);
    out.push_str(&format!(
        ", size: {}pt, fill: {}, lang: \"it\")\n",
        config.font.body_size,
        color(&palette.text)
    ));
    // Set up paragraph settings to prevent widows/orphans
    out.push_str("#set par(linebreaks: \"optimized\", leading: 0.7em)\n");
    out.push_str(&format!(
        "#set table(stroke: 0.5pt + {}, inset: 6pt)\n\n",
        color(&palette.border)
    ));
}

/// A header or footer line, shown from the template's first page on.
fn furniture_line(template: &PageTemplate, config: &Config, out: &mut String) {
    out.push_str(&format!(
        "context {{ if here().page() >= {} {{ set text(size: {}pt, fill: {}); grid(columns: (1fr, auto), ",
        template.first_page,
        config.font.small_size,
        color(&config.palette.muted)
    ));
    template_content(&template.left, out);
    out.push_str(", ");
    template_content(&template.right, out);
    out.push_str(") } }");
}

fn template_content(text: &str, out: &mut String) {
    out.push('[');
    for piece in PageTemplate::pieces(text) {
        match piece {
            Piece::Text(t) => escape_into(t, out),
            Piece::Page => out.push_str("#counter(page).display()"),
            Piece::Pages => out.push_str("#counter(page).final().first()"),
        }
    }
    out.push(']');
}

fn nodes_to_typst(nodes: &[Node], doc: &NativeDocument, out: &mut String) {
    for node in nodes {
        emit_node(node, doc, out);
    }
}

fn emit_node(node: &Node, doc: &NativeDocument, out: &mut String) {
    match node {
        Node::Text {
            runs,
            style,
            keep_with_next,
        } => text_to_typst(runs, style, *keep_with_next, out),
        Node::List { ordered, items } => {
            let marker = if *ordered { "+ " } else { "- " };
            // Short lists stay on one page
            let keep = items.len() <= 5;
            if keep {
                out.push_str("#block(breakable: false)[\n");
            }
            for item in items {
                out.push_str(marker);
                runs_to_typst(item, out);
                out.push('\n');
            }
            out.push_str(if keep { "]\n" } else { "\n" });
        }
        Node::Table(table) => table_to_typst(table, out),
        Node::Image { key, width } => {
            if let Some(image) = doc.images.get(key) {
                out.push_str("#align(center, image(");
                string_literal(&image.virtual_path(), out);
                out.push_str(&format!(", width: {width}pt))\n"));
            }
        }
        Node::Line { color: line, thickness } => {
            out.push_str(&format!(
                "#line(length: 100%, stroke: {thickness}pt + {})\n",
                color(line)
            ));
        }
        Node::Panel {
            fill,
            stroke,
            children,
        } => {
            out.push_str("#block(width: 100%, inset: 15pt, radius: 4pt, breakable: false");
            if let Some(fill) = fill {
                out.push_str(&format!(", fill: {}", color(fill)));
            }
            if let Some(stroke) = stroke {
                out.push_str(&format!(", stroke: 1pt + {}", color(stroke)));
            }
            out.push_str(")[\n");
            nodes_to_typst(children, doc, out);
            out.push_str("]\n");
        }
        Node::Columns(columns) => {
            let fractions = vec!["1fr"; columns.len()].join(", ");
            out.push_str(&format!("#grid(columns: ({fractions},), column-gutter: 20pt,\n"));
            for column in columns {
                out.push_str("[\n");
                nodes_to_typst(column, doc, out);
                out.push_str("],\n");
            }
            out.push_str(")\n");
        }
        Node::Spacer(height) => out.push_str(&format!("#v({height}pt)\n")),
        Node::PageBreak => out.push_str("#pagebreak()\n"),
    }
}

/// A sticky block is moved to the next page together with the start of the
/// block after it, which may itself still break.
fn text_to_typst(runs: &[Run], style: &TextStyle, sticky: bool, out: &mut String) {
    out.push_str(&format!(
        "#block(width: 100%, above: {}pt, below: {}pt",
        style.above, style.below
    ));
    if sticky {
        out.push_str(", sticky: true");
    }
    out.push_str(")[");
    let aligned = style.align != Align::Left;
    if aligned {
        out.push_str(&format!("#align({})[", align(style.align)));
    }
    out.push_str(&format!("#text(size: {}pt", style.size));
    if let Some(fill) = &style.color {
        out.push_str(&format!(", fill: {}", color(fill)));
    }
    out.push_str(")[");
    runs_to_typst(runs, out);
    out.push(']');
    if aligned {
        out.push(']');
    }
    out.push_str("]\n");
}

fn runs_to_typst(runs: &[Run], out: &mut String) {
    for run in runs.iter().filter(|r| !r.text.is_empty()) {
        let mut close = 0;
        if let Some(fill) = &run.color {
            out.push_str(&format!("#text(fill: {})[", color(fill)));
            close += 1;
        }
        if run.bold {
            out.push_str("#strong[");
            close += 1;
        }
        if run.italic {
            out.push_str("#emph[");
            close += 1;
        }
        escape_into(&run.text, out);
        for _ in 0..close {
            out.push(']');
        }
    }
}

fn table_to_typst(table: &TableNode, out: &mut String) {
    if table.widths.is_empty() {
        return;
    }
    out.push_str("#table(\n");
    let columns: Vec<String> = table.widths.iter().map(|w| format!("{w}fr")).collect();
    out.push_str(&format!("  columns: ({},),\n", columns.join(", ")));
    out.push_str(&format!("  stroke: 0.5pt + {},\n", color(&table.stroke)));

    let (header, body) = table.rows.split_at(table.header_rows.min(table.rows.len()));
    if !header.is_empty() {
        out.push_str("  table.header(\n");
        for row in header {
            row_to_typst(row, table.widths.len(), "    ", out);
        }
        out.push_str("  ),\n");
    }
    for row in body {
        row_to_typst(row, table.widths.len(), "  ", out);
    }
    out.push_str(")\n");
}

fn row_to_typst(row: &[CellNode], columns: usize, indent: &str, out: &mut String) {
    let empty = CellNode::default();
    for i in 0..columns {
        let cell = row.get(i).unwrap_or(&empty);
        out.push_str(indent);
        out.push_str(&format!("table.cell(align: {}", align(cell.align)));
        if let Some(fill) = &cell.fill {
            out.push_str(&format!(", fill: {}", color(fill)));
        }
        out.push_str(")[");
        if let Some(meter) = &cell.meter {
            out.push_str(&format!(
                "#box(width: 100%, height: 8pt, radius: 2pt, fill: luma(230))[#place(rect(width: {:.0}%, height: 8pt, radius: 2pt, fill: {}))]",
                meter.fraction.clamp(0.0, 1.0) * 100.0,
                color(&meter.color)
            ));
        }
        runs_to_typst(&cell.runs, out);
        out.push_str("],\n");
    }
}

fn align(align: Align) -> &'static str {
    match align {
        Align::Left => "left",
        Align::Center => "center",
        Align::Right => "right",
    }
}

fn color(hex: &str) -> String {
    let mut out = String::from("rgb(");
    string_literal(hex, &mut out);
    out.push(')');
    out
}

fn string_literal(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// Escape special Typst markup characters.
fn escape_into(text: &str, out: &mut String) {
    let mut prev = None;
    for ch in text.chars() {
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '/' | '~' | '='
            | '-' | '+' | '"' => {
                out.push('\\');
                out.push(ch);
            }
            // "1." would start a numbered list
            '.' if prev.is_some_and(|p: char| p.is_ascii_digit()) => out.push_str("\\."),
            _ => out.push(ch),
        }
        prev = Some(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartSet;
    use crate::charts::tests::png;
    use crate::native::{DocumentInfo, Meter};
    use crate::plan::tests::{chart_set, full_plan};

    fn escaped(text: &str) -> String {
        let mut out = String::new();
        escape_into(text, &mut out);
        out
    }

    fn lower(content: Vec<Node>, images: ChartSet) -> String {
        let plan = full_plan(ChartSet::new());
        let doc = NativeDocument {
            info: DocumentInfo {
                title: "T".into(),
                author: "A".into(),
                subject: String::new(),
                keywords: Vec::new(),
            },
            furniture: plan.furniture,
            content,
            images,
        };
        let mut out = String::new();
        nodes_to_typst(&doc.content, &doc, &mut out);
        out
    }

    fn text(runs: Vec<Run>, keep_with_next: bool) -> Node {
        Node::Text {
            runs,
            style: TextStyle {
                size: 10.0,
                color: None,
                align: Align::Left,
                above: 0.0,
                below: 6.0,
            },
            keep_with_next,
        }
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(escaped("a * b"), "a \\* b");
        assert_eq!(escaped("a # b"), "a \\# b");
        assert_eq!(escaped("a_b"), "a\\_b");
        assert_eq!(escaped("-98.912 €"), "\\-98\\.912 €");
        assert_eq!(escaped("4. STATO"), "4\\. STATO");
        assert_eq!(escaped("Fine."), "Fine.");
        assert_eq!(escaped("https://x"), "https:\\/\\/x");
    }

    #[test]
    fn styled_runs() {
        let run = Run {
            text: "ALLERTA".into(),
            bold: true,
            italic: false,
            color: Some("#f5365c".into()),
        };
        let mut out = String::new();
        runs_to_typst(&[run, Run::plain("")], &mut out);
        assert_eq!(out, "#text(fill: rgb(\"#f5365c\"))[#strong[ALLERTA]]");
    }

    #[test]
    fn heading_kept_with_next() {
        let out = lower(
            vec![
                text(vec![Run::plain("Titolo")], true),
                text(vec![Run::plain("Corpo")], false),
                Node::PageBreak,
            ],
            ChartSet::new(),
        );
        assert_eq!(
            out,
            "#block(width: 100%, above: 0pt, below: 6pt, sticky: true)[#text(size: 10pt)[Titolo]]\n\
             #block(width: 100%, above: 0pt, below: 6pt)[#text(size: 10pt)[Corpo]]\n\
             #pagebreak()\n"
        );
    }

    #[test]
    fn table_after_heading_stays_breakable() {
        let row = |t: &str| {
            vec![CellNode {
                runs: vec![Run::plain(t)],
                ..CellNode::default()
            }]
        };
        let table = TableNode {
            widths: vec![100.0],
            header_rows: 1,
            rows: (0..40).map(|i| row(&format!("Riga{i}"))).collect(),
            stroke: "#e2e8f0".into(),
        };
        let out = lower(
            vec![text(vec![Run::plain("Dettaglio")], true), Node::Table(table)],
            ChartSet::new(),
        );
        assert!(out.starts_with("#block(width: 100%, above: 0pt, below: 6pt, sticky: true)"));
        assert!(!out.contains("breakable: false"));
        assert!(out.contains("#table("));
    }

    #[test]
    fn lists() {
        let out = lower(
            vec![Node::List {
                ordered: true,
                items: vec![vec![Run::plain("uno")], vec![Run::plain("due")]],
            }],
            ChartSet::new(),
        );
        assert_eq!(out, "#block(breakable: false)[\n+ uno\n+ due\n]\n");
    }

    #[test]
    fn table_with_header_and_meter() {
        let cell = |t: &str| CellNode {
            runs: vec![Run::plain(t)],
            ..CellNode::default()
        };
        let table = TableNode {
            widths: vec![40.0, 60.0],
            header_rows: 1,
            rows: vec![
                vec![
                    CellNode {
                        fill: Some("#2f3e9e".into()),
                        ..cell("A")
                    },
                    cell("B"),
                ],
                vec![
                    CellNode {
                        align: Align::Right,
                        ..cell("1")
                    },
                    CellNode {
                        meter: Some(Meter {
                            fraction: 0.6,
                            color: "#f9b115".into(),
                        }),
                        ..CellNode::default()
                    },
                ],
                vec![cell("short")],
            ],
            stroke: "#e2e8f0".into(),
        };
        let out = lower(vec![Node::Table(table)], ChartSet::new());
        assert!(out.starts_with("#table(\n  columns: (40fr, 60fr,),\n"));
        assert!(out.contains(
            "  table.header(\n    table.cell(align: left, fill: rgb(\"#2f3e9e\"))[A],\n    table.cell(align: left)[B],\n  ),\n"
        ));
        assert!(out.contains("  table.cell(align: right)[1],\n"));
        assert!(out.contains("rect(width: 60%, height: 8pt, radius: 2pt, fill: rgb(\"#f9b115\"))"));
        // Missing cells are filled in.
        assert!(out.ends_with("  table.cell(align: left)[short],\n  table.cell(align: left)[],\n)\n"));
    }

    #[test]
    fn images_use_virtual_paths() {
        let images: ChartSet = [("economicTrend".to_string(), png("economicTrend"))].into();
        let out = lower(
            vec![
                Node::Image {
                    key: "economicTrend".into(),
                    width: 500.0,
                },
                Node::Image {
                    key: "stressTest".into(),
                    width: 450.0,
                },
            ],
            images,
        );
        assert_eq!(
            out,
            "#align(center, image(\"/charts/economicTrend.png\", width: 500pt))\n"
        );
    }

    #[test]
    fn page_furniture_uses_counters() {
        let config = Config::default();
        let plan = full_plan(chart_set(&[]));
        let doc = NativeDocument::from_plan(&plan, &config);
        let out = document_to_typst(&doc, &config);
        assert!(out.starts_with("#set document(title: \"Report Finanziario - BFLOWS S.R.L.\""));
        assert!(out.contains("header: context { if here().page() >= 2 {"));
        assert!(out.contains(
            "[Pagina #counter(page).display() di #counter(page).final().first()]"
        ));
        assert!(out.contains("footer: context { if here().page() >= 1 {"));
        assert!(out.contains("[Report generato il 15\\/01\\/2025]"));
        assert!(out.contains("#set text(font: \"Libertinus Serif\", size: 10pt"));
    }
}
