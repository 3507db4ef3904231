use std::fmt;

use serde::{Deserialize, Serialize};

use super::EvidenceRecord;

/// Compliance priority assigned by the prioritization stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Parse a priority label, ignoring case and surrounding noise like "1. HIGH"
    ///
    /// The last upper-case label on the line wins, else the last label in
    /// any case, so "Chemicals Act (low-volume exemption): HIGH" is HIGH.
    pub fn parse(text: &str) -> Option<Self> {
        let labels: Vec<(Self, bool)> = text
            .split(|c: char| !c.is_alphabetic())
            .filter_map(|word| {
                let label = match word.to_ascii_uppercase().as_str() {
                    "HIGH" => Self::High,
                    "MEDIUM" => Self::Medium,
                    "LOW" => Self::Low,
                    _ => return None,
                };
                Some((label, word.chars().all(|c| c.is_ascii_uppercase())))
            })
            .collect();

        labels
            .iter()
            .rev()
            .find(|(_, upper)| *upper)
            .or_else(|| labels.last())
            .map(|(label, _)| *label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Start date used when a plan hint does not provide one
    pub fn default_start_date(&self) -> &'static str {
        match self {
            Self::High => "immediately",
            Self::Medium => "within 1 month",
            Self::Low => "within 3 months",
        }
    }

    /// Action window shown next to the priority in reports
    pub fn action_window(&self) -> &'static str {
        match self {
            Self::High => "immediate action required",
            Self::Medium => "action within 1-3 months",
            Self::Low => "action within 6 months",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three fixed regulation categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    SafetyEnvironment,
    ProductCertification,
    FactoryOperations,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::SafetyEnvironment,
        Category::ProductCertification,
        Category::FactoryOperations,
    ];

    /// Parse a category label in English or Korean
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if lower.contains("cert") || lower.contains("인증") {
            Some(Self::ProductCertification)
        } else if lower.contains("factory")
            || lower.contains("operation")
            || lower.contains("공장")
            || lower.contains("운영")
        {
            Some(Self::FactoryOperations)
        } else if lower.contains("safety")
            || lower.contains("environment")
            || lower.contains("안전")
            || lower.contains("환경")
        {
            Some(Self::SafetyEnvironment)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SafetyEnvironment => "Safety/Environment",
            Self::ProductCertification => "Product Certification",
            Self::FactoryOperations => "Factory Operations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A regulation found applicable to the business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    /// Sequential identifier ("REG-001", ...)
    pub id: String,
    pub name: String,
    pub category: Category,
    pub why_applicable: String,
    pub authority: String,
    pub priority: Priority,
    /// Actionable requirements in the order the model listed them
    pub requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    pub evidence: Vec<EvidenceRecord>,
}

/// Identifier for the regulation at 1-based position `index`
pub fn regulation_id(index: usize) -> String {
    format!("REG-{:03}", index)
}
