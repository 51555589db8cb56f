use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::tracking::TrackingRecord;
use crate::models::user::User;

/// `Label: value` line inside a report section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub label: String,
    pub value: String,
}

impl ReportLine {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn text(&self) -> String {
        if self.label.is_empty() {
            self.value.clone()
        } else {
            format!("{}: {}", self.label, self.value)
        }
    }
}

/// Block that paginates as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub heading: String,
    pub lines: Vec<ReportLine>,
}

impl ReportSection {
    /// Vertical space the section takes, heading included
    pub fn height(&self, layout: &PageLayout) -> f32 {
        (1 + self.lines.len()) as f32 * layout.line_height + layout.section_spacing
    }
}

/// Structured report prior to pagination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    /// Lines placed once, at the top of the first page
    pub summary: Vec<ReportLine>,
    pub sections: Vec<ReportSection>,
}

/// Loosely-typed row for bulk reports; absent fields produce no line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&TrackingRecord> for ReportEntity {
    fn from(record: &TrackingRecord) -> Self {
        Self {
            name: Some(record.product_name.clone()),
            description: Some(record.description.clone()).filter(|d| !d.is_empty()),
            status: Some(record.current_status().label().to_string()),
            location: Some(record.current_location().to_string()).filter(|l| !l.is_empty()),
            created_at: Some(record.created_at),
        }
    }
}

impl From<&User> for ReportEntity {
    fn from(user: &User) -> Self {
        Self {
            name: Some(format!("{} ({})", user.name, user.role)),
            description: user.company.clone(),
            status: Some(if user.active { "Active" } else { "Inactive" }.to_string()),
            location: user.location.clone(),
            created_at: Some(user.created_at),
        }
    }
}

/// Bulk report flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Products,
    Users,
}

impl ReportType {
    pub fn title(self) -> &'static str {
        match self {
            ReportType::Products => "Products Report",
            ReportType::Users => "Users Report",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Products => "products",
            ReportType::Users => "users",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "products" => Ok(ReportType::Products),
            "users" => Ok(ReportType::Users),
            other => Err(ExportError::InvalidInput(format!("Unknown report type '{other}'"))),
        }
    }
}

/// Page geometry, in millimetres for the PDF back end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub top_margin: f32,
    pub bottom_margin: f32,
    pub left_margin: f32,
    pub line_height: f32,
    pub section_spacing: f32,
}

impl PageLayout {
    /// A4 portrait with the margins the exported reports use
    pub fn a4() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            top_margin: 30.0,
            bottom_margin: 20.0,
            left_margin: 20.0,
            line_height: 8.0,
            section_spacing: 6.0,
        }
    }

    pub fn usable_bottom(&self) -> f32 {
        self.page_height - self.bottom_margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Title,
    Summary,
    Heading,
    Body,
}

impl LineKind {
    pub fn font_size(self) -> f32 {
        match self {
            LineKind::Title => 18.0,
            LineKind::Summary => 12.0,
            LineKind::Heading => 12.0,
            LineKind::Body => 10.0,
        }
    }
}

/// Text line with its placement; `y` grows downwards from the page top
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Font size in points
    pub size: f32,
    pub kind: LineKind,
}

impl PlacedLine {
    /// Line at the default size for its kind
    pub fn new(text: String, x: f32, y: f32, kind: LineKind) -> Self {
        Self {
            text,
            x,
            y,
            size: kind.font_size(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<PlacedLine>,
    /// Number of sections that start on this page
    pub sections: usize,
}

/// Export failures; the artifact is discarded as a whole
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Product '{0}' not found")]
    NotFound(String),

    #[error("Rendering failed: {0}")]
    Render(String),
}
