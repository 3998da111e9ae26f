//! # Clearance Levels
//!
//! Ordered integer levels 1-6. Each has a display name and a display
//! colour, both of which travel in `access_redacted` responses.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::StoreError;

const NAMES: [&str; 6] = [
    "Level 1 - Unrestricted",
    "Level 2 - Restricted",
    "Level 3 - Confidential",
    "Level 4 - Secret",
    "Level 5 - Top Secret",
    "Level 6 - Cosmic Top Secret",
];

const COLOURS: [&str; 6] = [
    "#009F6B", "#0087BD", "#FFD300", "#FF6D00", "#C40233", "#850005",
];

/// A clearance level, always within 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ClearanceLevel(u8);

impl ClearanceLevel {
    pub const MIN: ClearanceLevel = ClearanceLevel(1);
    pub const MAX: ClearanceLevel = ClearanceLevel(6);

    /// Level at which any site file opens regardless of assignment.
    pub const SITE_OVERRIDE: ClearanceLevel = ClearanceLevel(3);

    pub fn new(level: u8) -> Result<Self, StoreError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(StoreError::InvalidClearance(i64::from(level)))
        }
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES[usize::from(self.0 - 1)]
    }

    /// `#RRGGBB` display colour.
    #[must_use]
    pub fn colour(self) -> &'static str {
        COLOURS[usize::from(self.0 - 1)]
    }

    pub fn all() -> impl Iterator<Item = ClearanceLevel> {
        (Self::MIN.0..=Self::MAX.0).map(ClearanceLevel)
    }
}

impl TryFrom<u8> for ClearanceLevel {
    type Error = StoreError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<ClearanceLevel> for u8 {
    fn from(level: ClearanceLevel) -> Self {
        level.0
    }
}

impl fmt::Display for ClearanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(ClearanceLevel::new(0).is_err());
        assert!(ClearanceLevel::new(7).is_err());
        assert_eq!(ClearanceLevel::all().count(), 6);
    }

    #[test]
    fn test_names_and_colours() {
        let secret = ClearanceLevel::new(4).unwrap();
        assert_eq!(secret.name(), "Level 4 - Secret");
        assert_eq!(secret.colour(), "#FF6D00");
        assert_eq!(ClearanceLevel::MAX.name(), "Level 6 - Cosmic Top Secret");
        assert_eq!(ClearanceLevel::SITE_OVERRIDE.name(), "Level 3 - Confidential");
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert_eq!(
            serde_json::from_str::<ClearanceLevel>("2").unwrap(),
            ClearanceLevel::new(2).unwrap()
        );
        assert!(serde_json::from_str::<ClearanceLevel>("9").is_err());
        assert_eq!(serde_json::to_string(&ClearanceLevel::MIN).unwrap(), "1");
    }
}
