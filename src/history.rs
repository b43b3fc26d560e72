//! Append-only record of distinct plant states.
//!
//! Entries are kept in insertion order and serialized as a JSON object
//! mapping each capture time (RFC 3339, full sub-second precision) to its
//! snapshot.  Deduplication only compares against the most recent entry,
//! so a state the plant returns to later is recorded again.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::app::ports::Document;
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `snapshot` unless it equals (ignoring time) the latest
    /// entry.  Returns whether the history changed.
    ///
    /// A snapshot carrying the same capture time as the latest entry
    /// replaces it, as the serialized map cannot hold duplicate keys.
    pub fn append(&mut self, snapshot: Snapshot) -> bool {
        match self.entries.last_mut() {
            Some(last) if *last == snapshot => false,
            Some(last) if last.time == snapshot.time => {
                debug!("history: replacing entry at {}", snapshot.time);
                *last = snapshot;
                true
            }
            _ => {
                self.entries.push(snapshot);
                true
            }
        }
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::CorruptState {
            document: Document::History,
            reason: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::CorruptState {
            document: Document::History,
            reason: e.to_string(),
        })
    }
}

fn key(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for snapshot in &self.entries {
            map.serialize_entry(&key(&snapshot.time), snapshot)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for History {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct HistoryVisitor;

        impl<'de> Visitor<'de> for HistoryVisitor {
            type Value = History;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of RFC 3339 timestamps to snapshots")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<History, A::Error> {
                let capacity = access.size_hint().unwrap_or(0);
                let mut entries: Vec<Snapshot> = Vec::with_capacity(capacity);
                let mut seen: HashSet<DateTime<Utc>> = HashSet::with_capacity(capacity);
                while let Some((k, snapshot)) = access.next_entry::<String, Snapshot>()? {
                    let time = DateTime::parse_from_rfc3339(&k)
                        .map_err(|e| serde::de::Error::custom(format!("key {k:?}: {e}")))?
                        .with_timezone(&Utc);
                    if time != snapshot.time {
                        return Err(serde::de::Error::custom(format!(
                            "key {k:?} does not match snapshot time {}",
                            key(&snapshot.time)
                        )));
                    }
                    if !seen.insert(time) {
                        return Err(serde::de::Error::custom(format!("duplicate key {k:?}")));
                    }
                    entries.push(snapshot);
                }
                Ok(History { entries })
            }
        }

        deserializer.deserialize_map(HistoryVisitor)
    }
}
