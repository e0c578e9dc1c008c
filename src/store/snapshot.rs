use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AdaEntry, PrayerName, QazaEvent};

/// Serializable state of the prayer log and the qaza ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub entries: Vec<AdaEntry>,
    #[serde(default)]
    pub qaza: BTreeMap<PrayerName, u64>,
    #[serde(default)]
    pub qaza_events: Vec<QazaEvent>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Serializing snapshot")
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("Parsing snapshot JSON")
    }
}
