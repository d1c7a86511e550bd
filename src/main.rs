use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use horizon_report::{
    Backend, ChartDirectory, ChartSource, Config, Exporter, Fallback, InlineCharts,
    MarkdownSections, ReportData, StaticTemplates,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "horizon-report")]
#[command(about = "Export financial analysis reports and notes to PDF")]
struct Cli {
    /// Company data JSON
    #[arg(short, long, global = true, default_value = "data.json")]
    data: PathBuf,

    /// Style config (TOML); built-in defaults when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of pre-rendered chart images (<key>.png)
    #[arg(long, global = true)]
    charts: Option<PathBuf>,

    /// Write a printable HTML page instead of a PDF
    #[arg(long, global = true)]
    html: bool,

    /// Output directory
    #[arg(short, long, global = true, default_value = ".")]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full report with cover page, contents and the eight standard sections
    Report {
        /// Assistant-written markdown, split on `## ` headings; sections it
        /// lacks fall back to templates built from the data
        #[arg(long)]
        sections: Option<PathBuf>,
    },
    /// Custom note from a single markdown file
    Note {
        /// Note title
        #[arg(short, long, default_value = "Nota Finanziaria")]
        title: String,

        /// Markdown file with the note body
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::compiled_default(),
    };

    let data = match ReportData::load(&cli.data) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Charts exported inline in the data take the place of a chart directory.
    let mut charts: Box<dyn ChartSource> = match &cli.charts {
        Some(dir) => Box::new(ChartDirectory::new(dir)),
        None => Box::new(InlineCharts::new(data.charts.clone())),
    };

    let backend = if cli.html { Backend::Html } else { Backend::Native };
    let exporter = Exporter::new(config, data.clone()).backend(backend);

    let rendered = match &cli.command {
        Command::Report { sections } => {
            let assistant = match sections {
                Some(path) => match MarkdownSections::load(path) {
                    Ok(sections) if sections.is_empty() => {
                        tracing::warn!(
                            path = %path.display(),
                            "no `## ` sections found, using templates"
                        );
                        sections
                    }
                    Ok(sections) => {
                        let titles: Vec<&str> = sections.titles().collect();
                        tracing::info!(?titles, "loaded assistant sections");
                        sections
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                None => MarkdownSections::default(),
            };
            let mut content = Fallback::new(assistant, StaticTemplates::new(&data));
            exporter.full_report(&mut content, charts.as_mut())
        }
        Command::Note { title, input } => {
            let markdown = match fs::read_to_string(input) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading {}: {}", input.display(), e);
                    std::process::exit(1);
                }
            };
            exporter.custom_note(title, &markdown, charts.as_mut())
        }
    };

    let document = match rendered {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match exporter.save(&document, &cli.output) {
        Ok(path) => println!("Created {}", path.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
