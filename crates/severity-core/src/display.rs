//! Presentation mapping for severity labels and probabilities.

use std::fmt;

use crate::enums::Severity;

/// Presentation bucket for a severity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Low,
    Medium,
    High,
    /// A label this client does not know, e.g. a class added server-side.
    Unknown,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }

    /// Badge colour used by the dashboard.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "yellow",
            Self::High => "red",
            Self::Unknown => "gray",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Severity> for Tier {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Minor => Self::Low,
            Severity::Moderate => Self::Medium,
            Severity::Severe => Self::High,
        }
    }
}

/// Map a raw severity label to its tier. Total: unknown labels map to
/// [`Tier::Unknown`].
pub fn severity_tier(label: &str) -> Tier {
    label
        .parse::<Severity>()
        .map(Tier::from)
        .unwrap_or(Tier::Unknown)
}

/// Render a fraction as a percentage with one decimal place, e.g. `0.847` → `"84.7%"`.
///
/// Values outside `[0, 1]` are not clamped.
pub fn format_percentage(fraction: f64) -> String {
    format_percentage_with(fraction, 1)
}

pub fn format_percentage_with(fraction: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, fraction * 100.0)
}
