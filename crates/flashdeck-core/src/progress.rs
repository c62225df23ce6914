//! Mastery progress

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CardId;

/// A user's mastery state. Exactly one exists per user/session; it is created
/// lazily and only ever reset, never deleted.
///
/// Mastered ids are not purged when a card disappears, so the set may mention
/// cards that no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Cards the user has mastered
    #[serde(default)]
    pub mastered_ids: BTreeSet<CardId>,
    /// Last time a card was marked, serialized as RFC 3339 or `""`
    #[serde(default, with = "empty_timestamp")]
    pub last_practiced_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Progress with the given mastered ids and no practice timestamp.
    pub fn with_mastered<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CardId>,
    {
        Self {
            mastered_ids: ids.into_iter().map(Into::into).collect(),
            last_practiced_at: None,
        }
    }

    /// Whether `id` is mastered.
    pub fn is_mastered(&self, id: &CardId) -> bool {
        self.mastered_ids.contains(id)
    }

    /// Flip membership of `id` and stamp the practice time.
    ///
    /// Returns the new membership.
    pub fn toggle(&mut self, id: &CardId, now: DateTime<Utc>) -> bool {
        let mastered = if self.mastered_ids.remove(id) {
            false
        } else {
            self.mastered_ids.insert(id.clone());
            true
        };
        self.last_practiced_at = Some(now);
        mastered
    }

    /// Union `ids` into the mastered set. Returns how many were new.
    pub fn merge_ids<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = CardId>,
    {
        let before = self.mastered_ids.len();
        self.mastered_ids.extend(ids);
        self.mastered_ids.len() - before
    }

    /// Union of two records; the later practice time wins.
    #[must_use]
    pub fn union(&self, other: &ProgressRecord) -> ProgressRecord {
        ProgressRecord {
            mastered_ids: self
                .mastered_ids
                .union(&other.mastered_ids)
                .cloned()
                .collect(),
            last_practiced_at: self.last_practiced_at.max(other.last_practiced_at),
        }
    }

    /// Whether nothing is mastered.
    pub fn is_empty(&self) -> bool {
        self.mastered_ids.is_empty()
    }

    /// Clear mastery and the practice time.
    pub fn reset(&mut self) {
        self.mastered_ids.clear();
        self.last_practiced_at = None;
    }
}

/// `Option<DateTime<Utc>>` persisted as an RFC 3339 string, with `""` for none.
///
/// Unparseable timestamps read back as none instead of failing the record.
mod empty_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_str(""),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .filter(|s| !s.is_empty())
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|ts| ts.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn toggle_flips_and_stamps() {
        let mut progress = ProgressRecord::default();
        let id = CardId::new("c1");
        assert!(progress.toggle(&id, at(10)));
        assert!(progress.is_mastered(&id));
        assert_eq!(progress.last_practiced_at, Some(at(10)));
        assert!(!progress.toggle(&id, at(20)));
        assert!(!progress.is_mastered(&id));
        assert_eq!(progress.last_practiced_at, Some(at(20)));
    }

    #[test]
    fn empty_timestamp_round_trip() {
        let progress = ProgressRecord::with_mastered(["a"]);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["lastPracticedAt"], "");
        assert_eq!(json["masteredIds"], serde_json::json!(["a"]));
        let back: ProgressRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn garbage_timestamp_reads_as_none() {
        let json = r#"{"masteredIds":["x"],"lastPracticedAt":"yesterday"}"#;
        let progress: ProgressRecord = serde_json::from_str(json).unwrap();
        assert_eq!(progress.last_practiced_at, None);
        assert_eq!(progress.mastered_ids.len(), 1);
    }

    #[test]
    fn union_keeps_both_sets_and_latest_time() {
        let mut a = ProgressRecord::with_mastered(["a", "b"]);
        a.last_practiced_at = Some(at(5));
        let mut b = ProgressRecord::with_mastered(["b", "c"]);
        b.last_practiced_at = Some(at(9));
        let merged = a.union(&b);
        assert_eq!(merged.mastered_ids.len(), 3);
        assert_eq!(merged.last_practiced_at, Some(at(9)));
    }

    #[test]
    fn merge_reports_new_ids() {
        let mut progress = ProgressRecord::with_mastered(["a"]);
        let added = progress.merge_ids(["a", "b", "c"].into_iter().map(CardId::from));
        assert_eq!(added, 2);
        progress.reset();
        assert!(progress.is_empty());
        assert_eq!(progress.last_practiced_at, None);
    }
}
