use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::LifecycleError;

/// Status of a delivery record as stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Initial status, set by the assignment workflow
    Pending,
    InProgress,
    /// Final in ordinary operation; carries the customer signature
    Delivered,
    Damaged,
    DoorLocked,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 5] = [
        DeliveryStatus::Pending,
        DeliveryStatus::InProgress,
        DeliveryStatus::Delivered,
        DeliveryStatus::Damaged,
        DeliveryStatus::DoorLocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::InProgress => "in_progress",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Damaged => "damaged",
            DeliveryStatus::DoorLocked => "door_locked",
        }
    }

    /// Human label used by agent views
    pub fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::InProgress => "In Progress",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Damaged => "Damaged/Return",
            DeliveryStatus::DoorLocked => "Door Locked",
        }
    }

    pub fn requires_signature(self) -> bool {
        self == DeliveryStatus::Delivered
    }

    /// Final status: nothing but itself may follow
    pub fn is_terminal(self) -> bool {
        self == DeliveryStatus::Delivered
    }

    /// Parse a wire name such as `door_locked`
    pub fn parse(value: &str) -> Result<Self, LifecycleError> {
        value.parse()
    }
}

impl FromStr for DeliveryStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| LifecycleError::UnknownStatus {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        for status in DeliveryStatus::ALL {
            assert_eq!(status.as_str().parse::<DeliveryStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "returned".parse::<DeliveryStatus>().unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownStatus { ref value } if value == "returned"));
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&DeliveryStatus::DoorLocked).unwrap();
        assert_eq!(json, "\"door_locked\"");
    }
}
