// Delivery data model shared by the lifecycle, the store client and the offline queue

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::lifecycle::DeliveryStatus;
use crate::priority::Priority;

/// Opaque delivery identifier assigned by the store.
///
/// The backend hands out numeric ids while other stores use strings, so both
/// are accepted on the wire and kept as text locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeliveryId(String);

impl DeliveryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for DeliveryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => DeliveryId(n.to_string()),
            RawId::Text(s) => DeliveryId(s),
        })
    }
}

impl From<u64> for DeliveryId {
    fn from(id: u64) -> Self {
        DeliveryId(id.to_string())
    }
}

impl From<&str> for DeliveryId {
    fn from(id: &str) -> Self {
        DeliveryId(id.to_string())
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single delivery assignment as kept by the delivery store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: DeliveryId,
    pub sku: String,
    pub quantity: u32,
    #[serde(default)]
    pub product_name: String,
    pub agent: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_mobile: String,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub priority: Priority,
    /// Scheduled delivery day
    pub date: NaiveDate,
    pub status: DeliveryStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    /// Encoded proof-of-delivery image, only once the record was delivered
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl DeliveryRecord {
    /// Build a freshly assigned delivery, the shape the assignment workflow creates.
    pub fn assigned(
        id: impl Into<DeliveryId>,
        sku: impl Into<String>,
        quantity: u32,
        agent: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            quantity,
            product_name: String::new(),
            agent: agent.into(),
            customer_name: String::new(),
            customer_mobile: String::new(),
            customer_address: String::new(),
            priority: Priority::Normal,
            date,
            status: DeliveryStatus::Pending,
            notes: String::new(),
            signature: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_customer(
        mut self,
        name: impl Into<String>,
        mobile: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.customer_name = name.into();
        self.customer_mobile = mobile.into();
        self.customer_address = address.into();
        self
    }

    /// Which tab of the agent view this record belongs to on `today`
    pub fn bucket(&self, today: NaiveDate) -> DayBucket {
        if self.date == today {
            DayBucket::Today
        } else {
            DayBucket::Past
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBucket {
    Today,
    /// Every day that is not today, including future dates
    Past,
}

/// The signed-in agent, passed explicitly instead of read from session globals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContext {
    pub agent: String,
}

impl AgentContext {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
        }
    }

    /// Whether the record is assigned to this agent
    pub fn owns(&self, record: &DeliveryRecord) -> bool {
        record.agent.trim().eq_ignore_ascii_case(self.agent.trim())
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_backend_payload_deserializes() {
        let json = r#"{
            "id": 42,
            "sku": "SKU-1",
            "quantity": 3,
            "productName": "Rice 5kg",
            "agent": "aravind.dlteam@example.com",
            "customerName": "Meena",
            "customerMobile": "+91-9000000000",
            "customerAddress": "12 Lake Rd",
            "priority": "perishable",
            "date": "2026-10-19",
            "status": "in_progress",
            "notes": null,
            "signature": ""
        }"#;

        let record: DeliveryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, DeliveryId::from(42));
        assert_eq!(record.priority, Priority::Perishable);
        assert_eq!(record.status, DeliveryStatus::InProgress);
        assert_eq!(record.notes, "");
        assert_eq!(record.signature, None);
    }

    #[test]
    fn test_missing_priority_defaults_to_normal() {
        let json = r#"{"id":"a1","sku":"S","quantity":1,"agent":"x","date":"2026-10-19","status":"pending"}"#;
        let record: DeliveryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.priority, Priority::Normal);
        assert_eq!(record.id.as_str(), "a1");
    }

    #[test]
    fn test_bucket_today_and_past() {
        let today = day("2026-10-19");
        let record = DeliveryRecord::assigned(1, "S", 1, "agent", today);
        assert_eq!(record.bucket(today), DayBucket::Today);
        assert_eq!(record.bucket(day("2026-10-20")), DayBucket::Past);
        assert_eq!(record.bucket(day("2026-10-18")), DayBucket::Past);
    }

    #[test]
    fn test_agent_context_ownership() {
        let record = DeliveryRecord::assigned(1, "S", 1, "Aravind@Example.com", day("2026-10-19"));
        assert!(AgentContext::new("aravind@example.com").owns(&record));
        assert!(!AgentContext::new("someone@example.com").owns(&record));
    }
}
