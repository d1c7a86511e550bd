//! Chart images and their placement.
//!
//! Rasterising a chart is somebody else's job: a [`ChartSource`] hands back
//! PNG or JPEG bytes for a chart key. This module collects those images one
//! at a time and decides which section each one follows.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::PathBuf;

use base64::Engine as _;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::ChartError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// A rendered chart ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub key: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ChartImage {
    pub fn new(key: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ChartError> {
        let key = key.into();
        match ImageFormat::sniff(&bytes) {
            Some(format) => Ok(Self { key, format, bytes }),
            None => Err(ChartError::Format(key)),
        }
    }

    /// Accepts a bare base64 payload or a `data:image/...;base64,` URI.
    pub fn from_base64(key: impl Into<String>, encoded: &str) -> Result<Self, ChartError> {
        let key = key.into();
        let payload = match encoded.find(',') {
            Some(comma) if encoded.starts_with("data:") => &encoded[comma + 1..],
            _ => encoded,
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|source| ChartError::Decode {
                key: key.clone(),
                source,
            })?;
        Self::new(key, bytes)
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Virtual path the image is published under for the Typst compiler.
    pub fn virtual_path(&self) -> String {
        format!("/charts/{}.{}", self.key, self.format.extension())
    }
}

/// Available charts by key.
pub type ChartSet = BTreeMap<String, ChartImage>;

/// Produces a chart image for a chart key.
pub trait ChartSource {
    fn render(&mut self, key: &str) -> Result<ChartImage, ChartError>;
}

/// Reads `<dir>/<key>.png` (or `.jpg`).
#[derive(Debug, Clone)]
pub struct ChartDirectory {
    root: PathBuf,
}

impl ChartDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ChartSource for ChartDirectory {
    fn render(&mut self, key: &str) -> Result<ChartImage, ChartError> {
        let candidates = ["png", "jpg", "jpeg"].map(|ext| self.root.join(format!("{key}.{ext}")));
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            return Err(ChartError::Unavailable(key.to_string()));
        };
        let bytes = fs::read(path).map_err(|source| ChartError::Read {
            key: key.to_string(),
            source,
        })?;
        ChartImage::new(key, bytes)
    }
}

/// Charts already exported as base64 strings, e.g. by the browser's
/// chart library.
#[derive(Debug, Clone, Default)]
pub struct InlineCharts {
    encoded: BTreeMap<String, String>,
}

impl InlineCharts {
    pub fn new(encoded: BTreeMap<String, String>) -> Self {
        Self { encoded }
    }
}

impl ChartSource for InlineCharts {
    fn render(&mut self, key: &str) -> Result<ChartImage, ChartError> {
        match self.encoded.get(key) {
            Some(encoded) if !encoded.trim().is_empty() => ChartImage::from_base64(key, encoded),
            _ => Err(ChartError::Unavailable(key.to_string())),
        }
    }
}

/// No charts at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCharts;

impl ChartSource for NoCharts {
    fn render(&mut self, key: &str) -> Result<ChartImage, ChartError> {
        Err(ChartError::Unavailable(key.to_string()))
    }
}

/// Chart keys any of `titles` could resolve to, in first-seen order.
pub fn wanted_charts<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
    let mut seen = BTreeSet::new();
    titles
        .into_iter()
        .flat_map(|title| classify(title).charts())
        .map(|spec| spec.key)
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Render each chart in turn. Failures are logged and the chart is left out.
pub fn collect(source: &mut dyn ChartSource, keys: &[&str]) -> ChartSet {
    let mut charts = ChartSet::new();
    for key in keys {
        debug!(chart = key, "rendering chart");
        match source.render(key) {
            Ok(image) => {
                charts.insert((*key).to_string(), image);
            }
            Err(e) => warn!(chart = key, error = %e, "chart omitted"),
        }
    }
    charts
}

/// Charts assigned to each routed title, in title order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartRoutes {
    slots: Vec<(String, Vec<String>)>,
}

impl ChartRoutes {
    /// Keys assigned to the i-th routed title.
    pub fn at(&self, index: usize) -> &[String] {
        self.slots.get(index).map(|(_, keys)| keys.as_slice()).unwrap_or(&[])
    }

    /// Keys assigned to the first routed title equal to `title`.
    pub fn for_title(&self, title: &str) -> &[String] {
        self.slots
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or(&[])
    }

    pub fn assigned_count(&self) -> usize {
        self.slots.iter().map(|(_, keys)| keys.len()).sum()
    }
}

/// Decide which charts follow which title.
///
/// Each title is classified; its kind supplies candidate chart keys. Keys
/// missing from `available` are skipped, and a key already placed after an
/// earlier title is not placed again.
pub fn route<'a>(titles: impl IntoIterator<Item = &'a str>, available: &ChartSet) -> ChartRoutes {
    let mut placed = HashSet::new();
    let slots = titles
        .into_iter()
        .map(|title| {
            let keys = classify(title)
                .charts()
                .iter()
                .map(|spec| spec.key)
                .filter(|key| available.contains_key(*key))
                .filter(|key| placed.insert(*key))
                .map(str::to_string)
                .collect();
            (title.to_string(), keys)
        })
        .collect();
    ChartRoutes { slots }
}
