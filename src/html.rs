//! Inline-styled HTML rendering of a report plan.
//!
//! The fragment mirrors the native tree section for section; the standalone
//! page wraps it with print CSS whose `@page` margin boxes carry the same
//! header and footer lines.

use crate::block::{Block, Span, looks_numeric, plain_text};
use crate::classify::SectionKind;
use crate::config::Config;
use crate::native::LOGO_KEY;
use crate::plan::{Cover, Item, PageTemplate, Piece, PlannedSection, ReportPlan};
use crate::tables::{FixedBlock, FixedTable, RowWeight};

/// A complete HTML document ready for a browser's print-to-PDF.
pub fn render_page(plan: &ReportPlan, config: &Config) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html lang=\"it\">\n<head>\n<meta charset=\"utf-8\">\n<title>");
    out.push_str(&esc(&plan.title));
    out.push_str("</title>\n<style>\n");
    out.push_str(&print_css(plan, config));
    out.push_str("</style>\n</head>\n<body>\n");
    out.push_str(&render_fragment(plan, config));
    out.push_str("</body>\n</html>\n");
    out
}

/// The report body as a self-contained fragment.
pub fn render_fragment(plan: &ReportPlan, config: &Config) -> String {
    let mut html = Html {
        plan,
        config,
        out: String::new(),
    };
    html.cover(&plan.cover);
    if plan.is_full_report() {
        html.contents(&plan.sections);
    }
    for (i, section) in plan.sections.iter().enumerate() {
        if plan.is_full_report() {
            html.out.push_str("<section style=\"break-before: page;\">\n");
            let title = format!("{}. {}", section.number, section.title.to_uppercase());
            html.heading(1, &[Span::plain(title)]);
            html.rule(1.0, &config.palette.border);
        } else {
            html.out.push_str("<section>\n");
            if i > 0 {
                html.heading(2, &[Span::plain(section.title.clone())]);
            }
        }
        html.section(section);
        html.out.push_str("</section>\n");
    }
    if let Some(disclaimer) = &plan.disclaimer {
        html.out.push_str("<div style=\"margin-top: 40pt;\"></div>\n");
        html.heading(3, &[Span::plain("Disclaimer")]);
        html.out.push_str(&format!(
            "<p style=\"font-size: {}pt; color: {}; font-style: italic;\">{}</p>\n",
            config.font.small_size,
            config.palette.muted,
            esc(disclaimer)
        ));
    }
    html.out
}

fn print_css(plan: &ReportPlan, config: &Config) -> String {
    let page = &config.page;
    let mut css = format!(
        "@page {{\n  size: {};\n  margin: {}pt {}pt;\n",
        page.paper.to_uppercase(),
        page.margin_y,
        page.margin_x
    );
    let boxes = [
        ("top-left", &plan.furniture.header, &plan.furniture.header.left),
        ("top-right", &plan.furniture.header, &plan.furniture.header.right),
        ("bottom-left", &plan.furniture.footer, &plan.furniture.footer.left),
        ("bottom-right", &plan.furniture.footer, &plan.furniture.footer.right),
    ];
    for (name, _, text) in &boxes {
        if text.is_empty() {
            continue;
        }
        css.push_str(&format!(
            "  @{name} {{ content: {}; font-size: {}pt; color: {}; }}\n",
            css_content(text),
            config.font.small_size,
            config.palette.muted
        ));
    }
    css.push_str("}\n");

    // Margin boxes hidden on the pages before each template starts.
    let hidden: Vec<&str> = boxes
        .iter()
        .filter(|(_, template, text)| template.first_page > 1 && !text.is_empty())
        .map(|(name, _, _)| *name)
        .collect();
    if !hidden.is_empty() {
        css.push_str("@page :first {");
        for name in hidden {
            css.push_str(&format!(" @{name} {{ content: none; }}"));
        }
        css.push_str(" }\n");
    }

    css.push_str(&format!(
        "body {{ font-family: {}; font-size: {}pt; line-height: 1.5; color: {}; }}\n",
        config.font.html_family, config.font.body_size, config.palette.text
    ));
    css.push_str("table { page-break-inside: auto; }\ntr { page-break-inside: avoid; }\n");
    css.push_str("h1, h2, h3, h4 { page-break-after: avoid; }\n");
    css
}

/// CSS `content` value for a page template.
fn css_content(text: &str) -> String {
    let parts: Vec<String> = PageTemplate::pieces(text)
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(t) => format!("\"{}\"", t.replace('\\', "\\\\").replace('"', "\\\"")),
            Piece::Page => "counter(page)".to_string(),
            Piece::Pages => "counter(pages)".to_string(),
        })
        .collect();
    parts.join(" ")
}

/// Escape text for HTML content and attribute values.
fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn spans(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans.iter().filter(|s| !s.text.is_empty()) {
        let text = esc(&span.text);
        match (span.bold, span.italic) {
            (true, true) => out.push_str(&format!("<strong><em>{text}</em></strong>")),
            (true, false) => out.push_str(&format!("<strong>{text}</strong>")),
            (false, true) => out.push_str(&format!("<em>{text}</em>")),
            (false, false) => out.push_str(&text),
        }
    }
    out
}

struct Html<'a> {
    plan: &'a ReportPlan,
    config: &'a Config,
    out: String,
}

impl Html<'_> {
    fn heading(&mut self, level: u8, content: &[Span]) {
        let level = level.clamp(1, 4);
        let (above, below) = if level <= 2 { (16, 10) } else { (12, 8) };
        self.out.push_str(&format!(
            "<h{level} style=\"font-size: {}pt; font-weight: bold; color: {}; margin: {above}pt 0 {below}pt 0;\">{}</h{level}>\n",
            self.config.headings.size(level),
            self.config.palette.heading(level),
            spans(content)
        ));
    }

    fn rule(&mut self, thickness: f32, color: &str) {
        self.out.push_str(&format!(
            "<hr style=\"border: none; border-top: {thickness}pt solid {color}; margin: 0 0 20pt 0;\">\n"
        ));
    }

    fn cover(&mut self, cover: &Cover) {
        let config = self.config;
        let palette = &config.palette;
        let plan = self.plan;
        let logo = plan.charts.get(LOGO_KEY);

        if !cover.full_page {
            if let Some(logo) = logo {
                self.out.push_str(&format!(
                    "<img src=\"{}\" alt=\"logo\" style=\"width: 120pt; margin-bottom: 20pt;\">\n",
                    logo.data_uri()
                ));
            }
            self.heading(1, &[Span::plain(cover.title.clone())]);
            self.out.push_str(&format!(
                "<p style=\"font-size: 14pt; color: {}; margin: 0 0 30pt 0;\">{}</p>\n",
                palette.muted,
                esc(&cover.subtitle)
            ));
            return;
        }

        self.out.push_str("<div style=\"text-align: center; padding-top: 60pt;\">\n");
        if let Some(logo) = logo {
            self.out.push_str(&format!(
                "<img src=\"{}\" alt=\"logo\" style=\"width: 150pt; margin-bottom: 40pt;\">\n",
                logo.data_uri()
            ));
        }
        self.out.push_str(&format!(
            "<h1 style=\"font-size: {}pt; font-weight: bold; color: {}; margin: 20pt 0 10pt 0;\">{}</h1>\n",
            config.headings.cover_title_size,
            palette.primary,
            esc(&cover.title)
        ));
        self.out.push_str(&format!(
            "<p style=\"font-size: {}pt; color: {}; margin: 0 0 40pt 0;\">{}</p>\n",
            config.headings.cover_subtitle_size,
            palette.muted,
            esc(&cover.subtitle)
        ));
        self.out.push_str(&format!(
            "<hr style=\"border: none; border-top: 2pt solid {}; margin: 40pt 0;\">\n",
            palette.primary
        ));
        if let Some(tagline) = &cover.tagline {
            self.out.push_str(&format!(
                "<p style=\"font-size: 14pt; font-weight: bold; margin: 0 0 60pt 0;\">{}</p>\n",
                esc(tagline)
            ));
        }
        self.out.push_str("</div>\n<table style=\"width: 100%; border-collapse: collapse;\"><tr>\n");
        for column in &cover.facts {
            self.out.push_str("<td style=\"width: 50%; vertical-align: top;\">\n");
            for fact in column {
                let color = fact.tone.color(palette).unwrap_or(&palette.subheading);
                self.out.push_str(&format!(
                    "<p style=\"font-size: 12pt; color: {}; margin: 0 0 4pt 0;\"><strong>{}:</strong></p>\n\
                     <p style=\"font-size: 12pt; color: {color}; margin: 0 0 12pt 0;\">{}</p>\n",
                    palette.subheading,
                    esc(&fact.label),
                    esc(&fact.value)
                ));
            }
            self.out.push_str("</td>\n");
        }
        self.out.push_str("</tr></table>\n");
    }

    fn contents(&mut self, sections: &[PlannedSection]) {
        let config = self.config;
        self.out.push_str("<div style=\"break-before: page;\">\n");
        self.heading(1, &[Span::plain("INDICE")]);
        self.rule(1.0, &config.palette.border);
        for section in sections {
            self.out.push_str(&format!(
                "<p style=\"font-size: 12pt; margin: 8pt 0;\">{}. {}</p>\n",
                section.number,
                esc(&section.title)
            ));
        }
        self.out.push_str("</div>\n");
    }

    fn section(&mut self, section: &PlannedSection) {
        for block in &section.fixed {
            self.fixed(block);
        }
        match &section.body {
            Ok(items) => {
                for item in items {
                    match item {
                        Item::Block(block) => self.block(block),
                        Item::Chart(key) => self.chart(key),
                    }
                }
                if items.is_empty()
                    && section.fixed.is_empty()
                    && section.kind == SectionKind::Generic
                {
                    self.note("Nessun contenuto disponibile per questa sezione.");
                }
            }
            Err(message) => self.failure(&section.title, message),
        }
        for key in &section.charts {
            self.chart(key);
        }
    }

    fn failure(&mut self, title: &str, message: &str) {
        let palette = &self.config.palette;
        self.out.push_str(&format!(
            "<div class=\"section-error\" style=\"border: 1pt solid {}; background: {}; border-radius: 4pt; padding: 15pt; margin-bottom: 12pt;\">\n\
             <p style=\"color: {}; font-weight: bold; margin: 0 0 6pt 0;\">Impossibile generare il contenuto della sezione &quot;{}&quot;.</p>\n\
             <p style=\"color: {}; font-size: {}pt; font-style: italic; margin: 0;\">{}</p>\n</div>\n",
            palette.negative,
            palette.stripe,
            palette.negative,
            esc(title),
            palette.muted,
            self.config.font.small_size,
            esc(message)
        ));
    }

    fn note(&mut self, text: &str) {
        self.out.push_str(&format!(
            "<p style=\"color: {}; font-style: italic;\">{}</p>\n",
            self.config.palette.muted,
            esc(text)
        ));
    }

    fn chart(&mut self, key: &str) {
        let Some(image) = self.plan.charts.get(key) else {
            return;
        };
        let content_width = self.config.page.content_width;
        let width = SectionKind::chart_width(key)
            .unwrap_or(content_width)
            .min(content_width);
        self.out.push_str(&format!(
            "<div style=\"text-align: center; margin: 12pt 0; page-break-inside: avoid;\"><img src=\"{}\" alt=\"{}\" style=\"width: {width}pt; max-width: 100%;\"></div>\n",
            image.data_uri(),
            esc(key)
        ));
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, spans } => self.heading(*level, spans),
            Block::Paragraph { spans: content } => {
                self.out.push_str(&format!("<p style=\"margin: 0 0 6pt 0;\">{}</p>\n", spans(content)));
            }
            Block::BulletList { items } => self.list("ul", items),
            Block::NumberedList { items } => self.list("ol", items),
            Block::Table { header, rows } => self.markdown_table(header, rows),
            Block::Rule => {
                let config = self.config;
                self.out.push_str(&format!(
                    "<hr style=\"border: none; border-top: 0.5pt solid {}; margin: 12pt 0;\">\n",
                    config.palette.border
                ));
            }
        }
    }

    fn list(&mut self, tag: &str, items: &[Vec<Span>]) {
        self.out.push_str(&format!("<{tag} style=\"margin: 0 0 10pt 0;\">\n"));
        for item in items {
            self.out.push_str(&format!("<li style=\"margin: 3pt 0;\">{}</li>\n", spans(item)));
        }
        self.out.push_str(&format!("</{tag}>\n"));
    }

    fn cell_style(&self, align_right: bool, fill: Option<&str>, bold: bool) -> String {
        let mut style = format!(
            "border: 0.5pt solid {}; padding: 6pt;",
            self.config.palette.border
        );
        if align_right {
            style.push_str(" text-align: right;");
        }
        if let Some(fill) = fill {
            style.push_str(&format!(" background: {fill};"));
        }
        if bold {
            style.push_str(" font-weight: bold;");
        }
        style
    }

    fn header_row(&mut self, cells: impl Iterator<Item = String>) {
        let palette = &self.config.palette;
        self.out.push_str("<thead><tr>");
        for cell in cells {
            self.out.push_str(&format!(
                "<th style=\"border: 0.5pt solid {}; padding: 6pt; text-align: left; background: {}; color: {}; font-weight: bold;\">{cell}</th>",
                palette.border, palette.primary, palette.on_primary
            ));
        }
        self.out.push_str("</tr></thead>\n");
    }

    fn markdown_table(&mut self, header: &[Vec<Span>], rows: &[Vec<Vec<Span>>]) {
        let columns = rows
            .iter()
            .map(Vec::len)
            .chain([header.len()])
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }
        let empty = Vec::new();
        self.out.push_str(TABLE_OPEN);
        self.header_row((0..columns).map(|i| spans(header.get(i).unwrap_or(&empty))));
        self.out.push_str("<tbody>\n");
        for (i, row) in rows.iter().enumerate() {
            let fill = (i % 2 == 1).then_some(self.config.palette.stripe.as_str());
            self.out.push_str("<tr>");
            for c in 0..columns {
                let cell = row.get(c).unwrap_or(&empty);
                let style = self.cell_style(looks_numeric(&plain_text(cell)), fill, false);
                self.out.push_str(&format!("<td style=\"{style}\">{}</td>", spans(cell)));
            }
            self.out.push_str("</tr>\n");
        }
        self.out.push_str("</tbody></table>\n");
    }

    fn fixed_table(&mut self, table: &FixedTable) {
        let config = self.config;
        let palette = &config.palette;
        self.out.push_str(TABLE_OPEN);
        self.out.push_str("<colgroup>");
        for width in &table.widths {
            self.out.push_str(&format!("<col style=\"width: {width}%;\">"));
        }
        self.out.push_str("</colgroup>\n");
        if !table.header.is_empty() {
            self.header_row(table.header.iter().map(|h| esc(h)));
        }
        self.out.push_str("<tbody>\n");
        for (i, row) in table.rows.iter().enumerate() {
            let fill = match row.weight {
                RowWeight::Total => Some(palette.total.as_str()),
                _ if i % 2 == 1 => Some(palette.stripe.as_str()),
                _ => None,
            };
            self.out.push_str("<tr>");
            for cell in &row.cells {
                let bold = row.weight != RowWeight::Normal || cell.bold;
                let style = self.cell_style(looks_numeric(&cell.text), fill, bold);
                let tone = cell.tone.color(palette);
                let mut content = String::new();
                if let Some(fraction) = cell.meter {
                    content.push_str(&format!(
                        "<div style=\"background: {}; height: 8pt; border-radius: 2pt;\"><div style=\"width: {:.0}%; height: 8pt; border-radius: 2pt; background: {};\"></div></div>",
                        palette.border,
                        fraction.clamp(0.0, 1.0) * 100.0,
                        tone.unwrap_or(&palette.primary)
                    ));
                }
                match tone {
                    Some(color) if !cell.text.is_empty() => content.push_str(&format!(
                        "<span style=\"color: {color};\">{}</span>",
                        esc(&cell.text)
                    )),
                    _ => content.push_str(&esc(&cell.text)),
                }
                self.out.push_str(&format!("<td style=\"{style}\">{content}</td>"));
            }
            self.out.push_str("</tr>\n");
        }
        self.out.push_str("</tbody></table>\n");
    }

    fn fixed(&mut self, block: &FixedBlock) {
        let config = self.config;
        let palette = &config.palette;
        match block {
            FixedBlock::Subheading(text) => self.heading(2, &[Span::plain(text.clone())]),
            FixedBlock::Table(table) => self.fixed_table(table),
            FixedBlock::ScoreBox {
                title,
                score,
                caption,
                tone,
            } => {
                self.out.push_str(&format!(
                    "<div style=\"background: {}; color: {}; text-align: center; border-radius: 4pt; padding: 15pt 20pt; margin-bottom: 20pt;\">\n\
                     <div style=\"font-size: 12pt; font-weight: bold;\">{}</div>\n\
                     <div style=\"font-size: 32pt; font-weight: bold; margin-top: 10pt;\">{}</div>\n\
                     <div style=\"font-size: 11pt; margin: 5pt 0 10pt 0;\">{}</div>\n</div>\n",
                    tone.color(palette).unwrap_or(&palette.primary),
                    palette.on_primary,
                    esc(title),
                    esc(score),
                    esc(caption)
                ));
            }
            FixedBlock::Status {
                label,
                value,
                tone,
                detail,
            } => {
                let color = tone.color(palette).unwrap_or(&palette.text);
                self.out.push_str(&format!(
                    "<p style=\"font-size: 12pt; margin: 0 0 12pt 0;\"><strong>{}</strong><strong style=\"color: {color};\">{}</strong>{}</p>\n",
                    esc(label),
                    esc(value),
                    esc(detail)
                ));
            }
            FixedBlock::Note(text) => self.note(text),
        }
    }
}

const TABLE_OPEN: &str =
    "<table style=\"width: 100%; border-collapse: collapse; margin-bottom: 12pt;\">\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartSet;
    use crate::data::tests::sample;
    use crate::plan::Mode;
    use crate::plan::tests::{chart_set, full_plan, today};

    #[test]
    fn escapes_text() {
        assert_eq!(esc("<b>A & \"B\"</b>"), "&lt;b&gt;A &amp; &quot;B&quot;&lt;/b&gt;");
        assert_eq!(
            spans(&[Span::plain("a<"), Span::bold("b"), Span::italic("c")]),
            "a&lt;<strong>b</strong><em>c</em>"
        );
    }

    #[test]
    fn page_css_carries_furniture() {
        let plan = full_plan(ChartSet::new());
        let page = render_page(&plan, &Config::default());
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("@top-right { content: \"Pagina \" counter(page) \" di \" counter(pages);"));
        assert!(page.contains("@bottom-left { content: \"Report generato il 15/01/2025\";"));
        assert!(page.contains("@page :first { @top-left { content: none; } @top-right { content: none; } }"));
        assert!(page.contains("size: A4;"));
    }

    #[test]
    fn sections_start_on_new_pages() {
        let plan = full_plan(ChartSet::new());
        let html = render_fragment(&plan, &Config::default());
        assert_eq!(html.matches("<section style=\"break-before: page;\">").count(), 8);
        let first = html.find("1. EXECUTIVE SUMMARY").unwrap();
        let last = html.find("8. RACCOMANDAZIONI STRATEGICHE").unwrap();
        assert!(first < last);
        assert!(html.contains("TOTALE ATTIVO"));
    }

    #[test]
    fn charts_embedded_as_data_uris() {
        let plan = full_plan(chart_set(&["economicTrend"]));
        let html = render_fragment(&plan, &Config::default());
        assert!(html.contains("<img src=\"data:image/png;base64,"));
        assert!(html.contains("alt=\"economicTrend\" style=\"width: 500pt;"));
        let chart = html.find("alt=\"economicTrend\"").unwrap();
        assert!(html.find("3. ANALISI ECONOMICA").unwrap() < chart);
        assert!(chart < html.find("4. STATO PATRIMONIALE").unwrap());
    }

    #[test]
    fn markdown_table_alignment_and_stripes() {
        let plan = ReportPlan::build(
            Mode::CustomNote { title: "Nota".into() },
            vec![(
                "Nota".into(),
                Ok("| Voce | Valore |\n|---|---|\n| Ricavi | 197.250 € |\n| Costi | 80.000 € |".into()),
            )],
            &sample(),
            ChartSet::new(),
            &Config::default(),
            today(),
        )
        .unwrap();
        let html = render_fragment(&plan, &Config::default());
        assert!(html.contains("<th style="));
        assert!(html.contains("text-align: right;\">197.250 €</td>"));
        assert!(html.contains("background: #f8fafc;\">80.000 €</td>"));
        assert!(html.contains("Disclaimer"));
    }

    #[test]
    fn risk_bars() {
        let plan = full_plan(ChartSet::new());
        let html = render_fragment(&plan, &Config::default());
        assert!(html.contains("width: 60%; height: 8pt; border-radius: 2pt; background: #f9b115;"));
        assert!(html.contains("<span style=\"color: #f5365c;\">ALLERTA</span>"));
    }
}
