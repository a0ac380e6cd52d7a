//! Common types and utilities shared across models.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking.
///
/// PENDING and CONFIRMED bookings block the item's calendar; CANCELLED and
/// COMPLETED never do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Whether a booking in this status counts toward the conflict check
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

/// Helper to parse an image-URL list JSON from the database
pub fn parse_images(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Helper to serialize an image-URL list to JSON for the database
pub fn serialize_images(images: &[String]) -> String {
    serde_json::to_string(images).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["PENDING", "CONFIRMED", "CANCELLED", "COMPLETED"] {
            let status: BookingStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("pending".parse::<BookingStatus>().is_err());
        assert!("".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(BookingStatus::Pending.is_blocking());
        assert!(BookingStatus::Confirmed.is_blocking());
        assert!(!BookingStatus::Cancelled.is_blocking());
        assert!(!BookingStatus::Completed.is_blocking());
    }

    #[test]
    fn test_parse_images() {
        assert_eq!(
            parse_images(r#"["https://cdn.example.com/a.jpg"]"#),
            vec!["https://cdn.example.com/a.jpg".to_string()]
        );
        assert!(parse_images("not json").is_empty());
        assert!(parse_images("[]").is_empty());
    }
}
