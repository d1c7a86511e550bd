//! Native paginated-document primitives.
//!
//! [`NativeDocument::from_plan`] turns a [`ReportPlan`] into a tree of text
//! runs, tables, images and breaks. The tree carries resolved styles
//! (sizes, colours, fills) so a paginating engine only has to lay it out.

use crate::block::{Block, Span, looks_numeric, plain_text};
use crate::charts::ChartSet;
use crate::classify::SectionKind;
use crate::config::Config;
use crate::plan::{Cover, Item, PageFurniture, PlannedSection, ReportPlan};
use crate::tables::{FixedBlock, FixedTable, RowWeight};

/// Styled text run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<String>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Self::default()
        }
    }

    fn colored(mut self, color: Option<&str>) -> Self {
        self.color = color.map(str::to_string);
        self
    }
}

impl From<&Span> for Run {
    fn from(span: &Span) -> Self {
        Self {
            text: span.text.clone(),
            bold: span.bold,
            italic: span.italic,
            color: None,
        }
    }
}

fn runs(spans: &[Span]) -> Vec<Run> {
    spans.iter().map(Run::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Paragraph-level text style.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Option<String>,
    pub align: Align,
    /// Space above, in points.
    pub above: f32,
    /// Space below, in points.
    pub below: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meter {
    /// Filled fraction, 0..=1.
    pub fraction: f32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellNode {
    pub runs: Vec<Run>,
    pub align: Align,
    pub fill: Option<String>,
    pub meter: Option<Meter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    /// Relative column widths.
    pub widths: Vec<f32>,
    /// Leading rows repeated on each page.
    pub header_rows: usize,
    pub rows: Vec<Vec<CellNode>>,
    pub stroke: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text {
        runs: Vec<Run>,
        style: TextStyle,
        /// Keep on the same page as the following node.
        keep_with_next: bool,
    },
    List {
        ordered: bool,
        items: Vec<Vec<Run>>,
    },
    Table(TableNode),
    /// Chart or logo from the document's image table.
    Image {
        key: String,
        width: f32,
    },
    Line {
        color: String,
        thickness: f32,
    },
    /// Filled, padded box.
    Panel {
        fill: Option<String>,
        stroke: Option<String>,
        children: Vec<Node>,
    },
    Columns(Vec<Vec<Node>>),
    Spacer(f32),
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeDocument {
    pub info: DocumentInfo,
    pub furniture: PageFurniture,
    pub content: Vec<Node>,
    /// Images referenced by [`Node::Image`], by key.
    pub images: ChartSet,
}

/// Key the brand logo is stored under in the image table.
pub const LOGO_KEY: &str = "logo";

impl NativeDocument {
    pub fn from_plan(plan: &ReportPlan, config: &Config) -> Self {
        let mut builder = Builder {
            config,
            images: &plan.charts,
            has_logo: plan.charts.contains_key(LOGO_KEY),
            out: Vec::new(),
        };

        builder.cover(&plan.cover);
        if plan.is_full_report() {
            builder.out.push(Node::PageBreak);
            builder.contents(&plan.sections);
        }
        for (i, section) in plan.sections.iter().enumerate() {
            if plan.is_full_report() {
                builder.out.push(Node::PageBreak);
                builder.section_title(section);
            } else if i > 0 {
                builder.heading(2, &[Span::plain(section.title.clone())]);
            }
            builder.section(section);
        }
        if let Some(disclaimer) = &plan.disclaimer {
            builder.disclaimer(disclaimer);
        }

        let (subject, keywords) = if plan.is_full_report() {
            (
                "Analisi Finanziaria Completa".to_string(),
                vec![
                    "financial report".to_string(),
                    "analisi finanziaria".to_string(),
                    "bilancio".to_string(),
                ],
            )
        } else {
            (plan.company.clone(), Vec::new())
        };

        Self {
            info: DocumentInfo {
                title: plan.title.clone(),
                author: config.brand.name.clone(),
                subject,
                keywords,
            },
            furniture: plan.furniture.clone(),
            content: builder.out,
            images: plan.charts.clone(),
        }
    }
}

struct Builder<'a> {
    config: &'a Config,
    images: &'a ChartSet,
    has_logo: bool,
    out: Vec<Node>,
}

impl Builder<'_> {
    fn style(&self, size: f32) -> TextStyle {
        TextStyle {
            size,
            color: None,
            align: Align::Left,
            above: 0.0,
            below: 6.0,
        }
    }

    fn text(&mut self, runs: Vec<Run>, style: TextStyle) {
        self.out.push(Node::Text {
            runs,
            style,
            keep_with_next: false,
        });
    }

    fn heading(&mut self, level: u8, spans: &[Span]) {
        let config = self.config;
        let headings = &config.headings;
        let palette = &config.palette;
        let mut runs = runs(spans);
        for run in &mut runs {
            run.bold = true;
        }
        self.out.push(Node::Text {
            runs,
            style: TextStyle {
                size: headings.size(level),
                color: Some(palette.heading(level).to_string()),
                align: Align::Left,
                above: if level <= 2 { 16.0 } else { 12.0 },
                below: if level <= 2 { 10.0 } else { 8.0 },
            },
            keep_with_next: true,
        });
    }

    fn rule(&mut self, thickness: f32, color: &str) {
        self.out.push(Node::Line {
            color: color.to_string(),
            thickness,
        });
    }

    fn cover(&mut self, cover: &Cover) {
        let config = self.config;
        let headings = &config.headings;
        let palette = &config.palette;

        if self.has_logo {
            self.out.push(Node::Image {
                key: LOGO_KEY.to_string(),
                width: if cover.full_page { 150.0 } else { 120.0 },
            });
            self.out.push(Node::Spacer(20.0));
        }

        if !cover.full_page {
            self.heading(1, &[Span::plain(cover.title.clone())]);
            let mut subtitle = self.style(14.0);
            subtitle.color = Some(palette.muted.clone());
            subtitle.below = 30.0;
            self.text(vec![Run::plain(cover.subtitle.clone())], subtitle);
            return;
        }

        self.out.push(Node::Spacer(60.0));
        let mut title = self.style(headings.cover_title_size);
        title.color = Some(palette.primary.clone());
        title.align = Align::Center;
        title.below = 10.0;
        self.text(vec![Run::bold(cover.title.clone())], title);

        let mut subtitle = self.style(headings.cover_subtitle_size);
        subtitle.color = Some(palette.muted.clone());
        subtitle.align = Align::Center;
        subtitle.below = 40.0;
        self.text(vec![Run::plain(cover.subtitle.clone())], subtitle);

        self.rule(2.0, &palette.primary);
        self.out.push(Node::Spacer(40.0));

        if let Some(tagline) = &cover.tagline {
            let mut style = self.style(14.0);
            style.align = Align::Center;
            style.below = 60.0;
            self.text(vec![Run::bold(tagline.clone())], style);
        }

        let columns = cover
            .facts
            .iter()
            .map(|facts| {
                facts
                    .iter()
                    .flat_map(|fact| {
                        let info = TextStyle {
                            size: 12.0,
                            color: Some(palette.subheading.clone()),
                            align: Align::Left,
                            above: 0.0,
                            below: 4.0,
                        };
                        [
                            Node::Text {
                                runs: vec![Run::bold(format!("{}:", fact.label))],
                                style: info.clone(),
                                keep_with_next: true,
                            },
                            Node::Text {
                                runs: vec![
                                    Run::plain(fact.value.clone())
                                        .colored(fact.tone.color(palette)),
                                ],
                                style: TextStyle { below: 12.0, ..info },
                                keep_with_next: false,
                            },
                        ]
                    })
                    .collect()
            })
            .collect();
        self.out.push(Node::Columns(columns));
    }

    fn contents(&mut self, sections: &[PlannedSection]) {
        let config = self.config;
        self.heading(1, &[Span::plain("INDICE")]);
        self.rule(1.0, &config.palette.border);
        self.out.push(Node::Spacer(20.0));
        for section in sections {
            let mut style = self.style(12.0);
            style.above = 8.0;
            style.below = 8.0;
            self.text(
                vec![Run::plain(format!("{}. {}", section.number, section.title))],
                style,
            );
        }
    }

    fn section_title(&mut self, section: &PlannedSection) {
        let title = format!("{}. {}", section.number, section.title.to_uppercase());
        let config = self.config;
        self.heading(1, &[Span::plain(title)]);
        self.rule(1.0, &config.palette.border);
        self.out.push(Node::Spacer(20.0));
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
            }
            Err(message) => self.failure(&section.title, message),
        }
        for key in &section.charts {
            self.chart(key);
        }
        if section.kind == SectionKind::Generic && section.fixed.is_empty() {
            if let Ok(items) = &section.body {
                if items.is_empty() {
                    self.note("Nessun contenuto disponibile per questa sezione.");
                }
            }
        }
    }

    fn failure(&mut self, title: &str, message: &str) {
        let config = self.config;
        let palette = &config.palette;
        let mut heading = self.style(config.font.body_size + 1.0);
        heading.color = Some(palette.negative.clone());
        let mut detail = self.style(config.font.small_size);
        detail.color = Some(palette.muted.clone());
        self.out.push(Node::Panel {
            fill: Some(palette.stripe.clone()),
            stroke: Some(palette.negative.clone()),
            children: vec![
                Node::Text {
                    runs: vec![Run::bold(format!(
                        "Impossibile generare il contenuto della sezione \"{title}\"."
                    ))],
                    style: heading,
                    keep_with_next: true,
                },
                Node::Text {
                    runs: vec![Run {
                        italic: true,
                        ..Run::plain(message)
                    }],
                    style: detail,
                    keep_with_next: false,
                },
            ],
        });
    }

    fn note(&mut self, text: &str) {
        let mut style = self.style(self.config.font.body_size);
        style.color = Some(self.config.palette.muted.clone());
        self.text(
            vec![Run {
                italic: true,
                ..Run::plain(text)
            }],
            style,
        );
    }

    fn disclaimer(&mut self, text: &str) {
        self.out.push(Node::Spacer(40.0));
        self.heading(3, &[Span::plain("Disclaimer")]);
        let mut style = self.style(self.config.font.small_size);
        style.color = Some(self.config.palette.muted.clone());
        self.text(
            vec![Run {
                italic: true,
                ..Run::plain(text)
            }],
            style,
        );
    }

    fn chart(&mut self, key: &str) {
        if !self.images.contains_key(key) {
            return;
        }
        let content_width = self.config.page.content_width;
        let width = SectionKind::chart_width(key)
            .unwrap_or(content_width)
            .min(content_width);
        self.out.push(Node::Image {
            key: key.to_string(),
            width,
        });
        self.out.push(Node::Spacer(12.0));
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, spans } => self.heading(*level, spans),
            Block::Paragraph { spans } => {
                let style = self.style(self.config.font.body_size);
                self.text(runs(spans), style);
            }
            Block::BulletList { items } => self.out.push(Node::List {
                ordered: false,
                items: items.iter().map(|item| runs(item)).collect(),
            }),
            Block::NumberedList { items } => self.out.push(Node::List {
                ordered: true,
                items: items.iter().map(|item| runs(item)).collect(),
            }),
            Block::Table { header, rows } => {
                let table = self.markdown_table(header, rows);
                self.out.push(Node::Table(table));
            }
            Block::Rule => {
                let config = self.config;
                self.rule(0.5, &config.palette.border);
            }
        }
    }

    fn header_cell(&self, runs: Vec<Run>) -> CellNode {
        let palette = &self.config.palette;
        CellNode {
            runs: runs
                .into_iter()
                .map(|run| Run {
                    bold: true,
                    color: Some(palette.on_primary.clone()),
                    ..run
                })
                .collect(),
            align: Align::Left,
            fill: Some(palette.primary.clone()),
            meter: None,
        }
    }

    fn markdown_table(&self, header: &[Vec<Span>], rows: &[Vec<Vec<Span>>]) -> TableNode {
        let columns = rows
            .iter()
            .map(Vec::len)
            .chain([header.len()])
            .max()
            .unwrap_or(0);
        let padded = |cells: &[Vec<Span>]| -> Vec<Vec<Span>> {
            let mut cells = cells.to_vec();
            cells.resize(columns, Vec::new());
            cells
        };

        let mut table_rows = vec![
            padded(header)
                .iter()
                .map(|cell| self.header_cell(runs(cell)))
                .collect::<Vec<_>>(),
        ];
        for (i, row) in rows.iter().enumerate() {
            let fill = (i % 2 == 1).then(|| self.config.palette.stripe.clone());
            table_rows.push(
                padded(row)
                    .iter()
                    .map(|cell| CellNode {
                        runs: runs(cell),
                        align: if looks_numeric(&plain_text(cell)) {
                            Align::Right
                        } else {
                            Align::Left
                        },
                        fill: fill.clone(),
                        meter: None,
                    })
                    .collect(),
            );
        }

        TableNode {
            widths: vec![1.0; columns],
            header_rows: 1,
            rows: table_rows,
            stroke: self.config.palette.border.clone(),
        }
    }

    fn fixed_table(&self, table: &FixedTable) -> TableNode {
        let palette = &self.config.palette;
        let mut rows = Vec::new();
        if !table.header.is_empty() {
            rows.push(
                table
                    .header
                    .iter()
                    .map(|h| self.header_cell(vec![Run::plain(h.clone())]))
                    .collect(),
            );
        }
        for (i, row) in table.rows.iter().enumerate() {
            let fill = match row.weight {
                RowWeight::Total => Some(palette.total.clone()),
                _ if i % 2 == 1 => Some(palette.stripe.clone()),
                _ => None,
            };
            let bold = row.weight != RowWeight::Normal;
            rows.push(
                row.cells
                    .iter()
                    .map(|cell| CellNode {
                        runs: if cell.text.is_empty() {
                            Vec::new()
                        } else {
                            vec![Run {
                                bold: bold || cell.bold,
                                ..Run::plain(cell.text.clone())
                            }
                            .colored(cell.tone.color(palette))]
                        },
                        align: if looks_numeric(&cell.text) {
                            Align::Right
                        } else {
                            Align::Left
                        },
                        fill: fill.clone(),
                        meter: cell.meter.map(|fraction| Meter {
                            fraction,
                            color: cell
                                .tone
                                .color(palette)
                                .unwrap_or(&palette.primary)
                                .to_string(),
                        }),
                    })
                    .collect(),
            );
        }
        TableNode {
            widths: table.widths.iter().map(|w| f32::from(*w)).collect(),
            header_rows: usize::from(!table.header.is_empty()),
            rows,
            stroke: palette.border.clone(),
        }
    }

    fn fixed(&mut self, block: &FixedBlock) {
        let config = self.config;
        let palette = &config.palette;
        match block {
            FixedBlock::Subheading(text) => self.heading(2, &[Span::plain(text.clone())]),
            FixedBlock::Table(table) => {
                let table = self.fixed_table(table);
                self.out.push(Node::Table(table));
                self.out.push(Node::Spacer(12.0));
            }
            FixedBlock::ScoreBox {
                title,
                score,
                caption,
                tone,
            } => {
                let white = Some(palette.on_primary.clone());
                let centered = |size: f32| TextStyle {
                    size,
                    color: white.clone(),
                    align: Align::Center,
                    above: 0.0,
                    below: 6.0,
                };
                let fill = tone.color(palette).unwrap_or(&palette.primary).to_string();
                let panel = Node::Panel {
                    fill: Some(fill),
                    stroke: None,
                    children: vec![
                        Node::Text {
                            runs: vec![Run::bold(title.clone())],
                            style: centered(12.0),
                            keep_with_next: true,
                        },
                        Node::Text {
                            runs: vec![Run::bold(score.clone())],
                            style: centered(32.0),
                            keep_with_next: true,
                        },
                        Node::Text {
                            runs: vec![Run::plain(caption.clone())],
                            style: centered(11.0),
                            keep_with_next: false,
                        },
                    ],
                };
                self.out.push(panel);
                self.out.push(Node::Spacer(20.0));
            }
            FixedBlock::Status {
                label,
                value,
                tone,
                detail,
            } => {
                let runs = vec![
                    Run::bold(label.clone()),
                    Run::bold(value.clone()).colored(tone.color(palette)),
                    Run::plain(detail.clone()),
                ];
                let mut style = self.style(12.0);
                style.below = 12.0;
                self.text(runs, style);
            }
            FixedBlock::Note(text) => self.note(text),
        }
    }
}

/// Visible text of a node tree, one entry per text node, cell and list
/// item, in document order.
pub fn visible_text(nodes: &[Node]) -> Vec<String> {
    fn join(runs: &[Run]) -> String {
        runs.iter().map(|r| r.text.as_str()).collect()
    }
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Text { runs, .. } => out.push(join(runs)),
            Node::List { items, .. } => out.extend(items.iter().map(|i| join(i))),
            Node::Table(table) => {
                out.extend(table.rows.iter().flatten().map(|c| join(&c.runs)));
            }
            Node::Panel { children, .. } => out.extend(visible_text(children)),
            Node::Columns(columns) => {
                for column in columns {
                    out.extend(visible_text(column));
                }
            }
            Node::Image { .. } | Node::Line { .. } | Node::Spacer(_) | Node::PageBreak => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartSet;
    use crate::data::tests::sample;
    use crate::error::ContentError;
    use crate::plan::tests::{chart_set, full_contents, full_plan, today};
    use crate::plan::{Mode, STANDARD_SECTIONS};

    fn images(doc: &NativeDocument) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Node::Image { key, .. } => out.push(key),
                    Node::Panel { children, .. } => walk(children, out),
                    Node::Columns(columns) => columns.iter().for_each(|c| walk(c, out)),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&doc.content, &mut out);
        out
    }

    #[test]
    fn full_report_layout() {
        let plan = full_plan(ChartSet::new());
        let doc = NativeDocument::from_plan(&plan, &Config::default());
        let breaks = doc
            .content
            .iter()
            .filter(|n| matches!(n, Node::PageBreak))
            .count();
        // Cover, contents, then one page per section.
        assert_eq!(breaks, 1 + STANDARD_SECTIONS.len());

        let text = visible_text(&doc.content);
        assert!(text.contains(&"REPORT FINANZIARIO".to_string()));
        assert!(text.contains(&"INDICE".to_string()));
        assert!(text.contains(&"4. Stato Patrimoniale".to_string()));
        assert!(text.contains(&"4. STATO PATRIMONIALE".to_string()));
        assert!(text.contains(&"TOTALE ATTIVO".to_string()));
        assert_eq!(doc.info.author, "Horizon Financial Monitor");
    }

    #[test]
    fn headings_shrink_by_level() {
        let plan = full_plan(ChartSet::new());
        let config = Config::default();
        let doc = NativeDocument::from_plan(&plan, &config);
        let mut builder = Builder {
            config: &config,
            images: &doc.images,
            has_logo: false,
            out: Vec::new(),
        };
        for level in 1..=4 {
            builder.heading(level, &[Span::plain("x")]);
        }
        let sizes: Vec<f32> = builder
            .out
            .iter()
            .map(|n| match n {
                Node::Text { style, keep_with_next, .. } => {
                    assert!(*keep_with_next);
                    style.size
                }
                _ => unreachable!(),
            })
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn markdown_table_styles() {
        let config = Config::default();
        let images = ChartSet::new();
        let builder = Builder {
            config: &config,
            images: &images,
            has_logo: false,
            out: Vec::new(),
        };
        let cell = |t: &str| vec![Span::plain(t)];
        let table = builder.markdown_table(
            &[cell("Voce"), cell("Valore")],
            &[
                vec![cell("Ricavi"), cell("197.250 €")],
                vec![cell("EBITDA")],
            ],
        );
        assert_eq!(table.widths, [1.0, 1.0]);
        assert_eq!(table.rows[0][0].fill.as_deref(), Some("#2f3e9e"));
        assert_eq!(table.rows[1][1].align, Align::Right);
        assert_eq!(table.rows[1][0].fill, None);
        assert_eq!(table.rows[2][0].fill.as_deref(), Some("#f8fafc"));
        // Short rows are padded to the column count.
        assert_eq!(table.rows[2].len(), 2);
    }

    #[test]
    fn charts_become_images_clamped_to_content_width() {
        let plan = full_plan(chart_set(&["economicTrend", "stressTest"]));
        let mut config = Config::default();
        config.page.content_width = 480.0;
        let doc = NativeDocument::from_plan(&plan, &config);
        assert_eq!(images(&doc), ["economicTrend", "stressTest"]);
        let widths: Vec<f32> = doc
            .content
            .iter()
            .filter_map(|n| match n {
                Node::Image { width, .. } => Some(*width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, [480.0, 450.0]);
    }

    #[test]
    fn failed_section_shows_placeholder() {
        let mut contents = full_contents();
        contents[2].1 = Err(ContentError::Upstream("servizio non raggiungibile".into()));
        let plan = crate::plan::ReportPlan::build(
            Mode::FullReport,
            contents,
            &sample(),
            ChartSet::new(),
            &Config::default(),
            today(),
        )
        .unwrap();
        let text = visible_text(&NativeDocument::from_plan(&plan, &Config::default()).content);
        assert!(text.contains(
            &"Impossibile generare il contenuto della sezione \"Analisi Economica\".".to_string()
        ));
        assert!(text.contains(&"servizio non raggiungibile".to_string()));
        assert!(text.contains(&"Testo per Stato Patrimoniale.".to_string()));
    }

    #[test]
    fn note_has_compact_cover_and_disclaimer() {
        let plan = crate::plan::ReportPlan::build(
            Mode::CustomNote {
                title: "Liquidità".into(),
            },
            vec![("Liquidità".into(), Ok("Cassa **adeguata**.".into()))],
            &sample(),
            ChartSet::new(),
            &Config::default(),
            today(),
        )
        .unwrap();
        let doc = NativeDocument::from_plan(&plan, &Config::default());
        assert!(!doc.content.iter().any(|n| matches!(n, Node::PageBreak)));
        let text = visible_text(&doc.content);
        assert_eq!(text[0], "Liquidità");
        assert_eq!(text[1], "BFLOWS S.R.L.");
        assert_eq!(text[2], "Cassa adeguata.");
        assert_eq!(text[text.len() - 2], "Disclaimer");
    }

    #[test]
    fn risk_meter_uses_profile_colour() {
        let plan = full_plan(ChartSet::new());
        let doc = NativeDocument::from_plan(&plan, &Config::default());
        let meter = doc
            .content
            .iter()
            .filter_map(|n| match n {
                Node::Table(t) => Some(t),
                _ => None,
            })
            .flat_map(|t| t.rows.iter().flatten())
            .find_map(|c| c.meter.clone())
            .unwrap();
        assert_eq!(meter.fraction, 0.6);
        assert_eq!(meter.color, "#f9b115");
    }
}
