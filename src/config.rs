use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Style and wording shared by both renderers.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub brand: BrandConfig,
    pub page: PageConfig,
    pub font: FontConfig,
    pub palette: Palette,
    pub headings: HeadingConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrandConfig {
    pub name: String,
    pub logo: Option<PathBuf>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: "Horizon Financial Monitor".to_string(),
            logo: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub paper: String,
    /// Content width in points, used to clamp image widths.
    pub content_width: f32,
    pub margin_x: f32,
    pub margin_y: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            paper: "a4".to_string(),
            content_width: 515.0,
            margin_x: 40.0,
            margin_y: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    pub html_family: String,
    pub body_size: f32,
    pub small_size: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Libertinus Serif".to_string(),
            html_family: "Helvetica, Arial, sans-serif".to_string(),
            body_size: 10.0,
            small_size: 8.0,
        }
    }
}

/// Hex colours.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Palette {
    pub primary: String,
    pub text: String,
    pub muted: String,
    pub subheading: String,
    pub on_primary: String,
    pub positive: String,
    pub negative: String,
    pub warning: String,
    pub border: String,
    pub stripe: String,
    pub total: String,
    pub light_green: String,
    pub orange: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: "#2f3e9e".to_string(),
            text: "#1e293b".to_string(),
            muted: "#64748b".to_string(),
            subheading: "#475569".to_string(),
            on_primary: "#ffffff".to_string(),
            positive: "#24b47e".to_string(),
            negative: "#f5365c".to_string(),
            warning: "#f9b115".to_string(),
            border: "#e2e8f0".to_string(),
            stripe: "#f8fafc".to_string(),
            total: "#f1f5f9".to_string(),
            light_green: "#5dd39e".to_string(),
            orange: "#fb8833".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeadingConfig {
    pub h1_size: f32,
    pub h2_size: f32,
    pub h3_size: f32,
    pub h4_size: f32,
    pub cover_title_size: f32,
    pub cover_subtitle_size: f32,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            h1_size: 24.0,
            h2_size: 18.0,
            h3_size: 14.0,
            h4_size: 12.0,
            cover_title_size: 32.0,
            cover_subtitle_size: 18.0,
        }
    }
}

impl HeadingConfig {
    /// Font size for a heading level; levels past 4 use the level-4 size.
    pub fn size(&self, level: u8) -> f32 {
        match level {
            1 => self.h1_size,
            2 => self.h2_size,
            3 => self.h3_size,
            _ => self.h4_size,
        }
    }
}

impl Palette {
    /// Level 1-2 headings use the brand colour, deeper levels the subdued one.
    pub fn heading(&self, level: u8) -> &str {
        if level <= 2 {
            &self.primary
        } else {
            &self.subheading
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Fiscal year whose figures fill the fixed tables.
    pub year: String,
    pub previous_year: String,
    pub missing_value: String,
    pub disclaimer: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            year: "2024".to_string(),
            previous_year: "2023".to_string(),
            missing_value: "N/D".to_string(),
            disclaimer: "Questo documento è stato generato automaticamente da un assistente AI \
                         basato sui dati finanziari disponibili. Le informazioni contenute sono \
                         fornite a scopo informativo e non costituiscono consulenza finanziaria \
                         professionale."
                .to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The config shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        // Syntax is checked by build.rs.
        Self::from_toml(DEFAULT_CONFIG).unwrap_or_default()
    }
}
