//! Setting model
//!
//! Settings are string-keyed records holding arbitrary JSON values. The
//! backup scheduling policy lives here under the `backup` key so it
//! survives backup/restore along with everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single setting record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Setting name; primary key
    pub key: String,

    /// Arbitrary JSON value
    pub value: serde_json::Value,

    /// When the setting was last written
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    /// Create a setting from any serializable value
    pub fn new<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: key.into(),
            value: serde_json::to_value(value)?,
            updated_at: Utc::now(),
        })
    }

    /// Deserialize the value into a concrete type
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_value() {
        let setting = Setting::new("tax_rate_bps", &825u32).unwrap();
        assert_eq!(setting.key, "tax_rate_bps");
        let parsed: u32 = setting.parse().unwrap();
        assert_eq!(parsed, 825);
    }
}
