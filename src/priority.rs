use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority levels for delivery assignments
/// Higher values sort earlier in an agent's list; priority never blocks a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    /// Regular parcel (0)
    #[default]
    Normal = 0,
    /// Goods that spoil, deliver early in the day (1)
    Perishable = 1,
    /// Must be delivered first (2)
    Emergency = 2,
}

impl Priority {
    /// Determine priority from the assignment label.
    /// Unknown or blank labels fall back to normal, as assignments without a
    /// priority are shown as "normal".
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "emergency" => Priority::Emergency,
            "perishable" => Priority::Perishable,
            _ => Priority::Normal,
        }
    }

    /// Wire label as stored by the delivery backend
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Perishable => "perishable",
            Priority::Emergency => "emergency",
        }
    }

    /// Whether an agent view should highlight this delivery
    pub fn is_highlighted(self) -> bool {
        self > Priority::Normal
    }
}

impl From<String> for Priority {
    fn from(label: String) -> Self {
        Priority::from_label(&label)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Emergency => "EMERGENCY",
            Priority::Perishable => "PERISHABLE",
            Priority::Normal => "NORMAL",
        };
        write!(f, "{}", label)
    }
}
