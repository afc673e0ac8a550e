//! Whole-dataset snapshot used for export, import and backups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{member::Member, payment::Payment};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuesSnapshot {
    #[serde(default = "DuesSnapshot::default_version")]
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl DuesSnapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_SCHEMA_VERSION,
            timestamp,
            members: Vec::new(),
            payments: Vec::new(),
        }
    }

    pub fn with_data(
        timestamp: DateTime<Utc>,
        members: Vec<Member>,
        payments: Vec<Payment>,
    ) -> Self {
        Self {
            version: SNAPSHOT_SCHEMA_VERSION,
            timestamp,
            members,
            payments,
        }
    }

    fn default_version() -> u32 {
        SNAPSHOT_SCHEMA_VERSION
    }
}
