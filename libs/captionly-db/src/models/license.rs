use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Used,
    Revoked,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Used => "used",
            LicenseStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LicenseStatus::Active),
            "used" => Ok(LicenseStatus::Used),
            "revoked" => Ok(LicenseStatus::Revoked),
            other => Err(UnknownVariant {
                kind: "license status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub key: String,
    pub expires_at: DateTime<Utc>,
    pub status: LicenseStatus,
    pub created_at: DateTime<Utc>,
    /// Set once by a successful redemption and never cleared.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl License {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Admin toggle target. Active and used keys go to revoked. A revoked key
    /// goes back to active only if it was never redeemed, otherwise to used.
    pub fn toggled_status(&self) -> LicenseStatus {
        match self.status {
            LicenseStatus::Active | LicenseStatus::Used => LicenseStatus::Revoked,
            LicenseStatus::Revoked if self.redeemed_at.is_some() => LicenseStatus::Used,
            LicenseStatus::Revoked => LicenseStatus::Active,
        }
    }
}
