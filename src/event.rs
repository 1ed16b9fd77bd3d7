use {
    serde::Deserialize,
    std::time::{SystemTime, UNIX_EPOCH},
};

/// Kind of change admitted into the window
///
/// Only edits and page creations are interesting; every other change
/// kind on the feed (log entries, categorization, ...) is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Edit,
    New,
}

impl ChangeKind {
    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "edit" => Some(ChangeKind::Edit),
            "new" => Some(ChangeKind::New),
            _ => None,
        }
    }
}

/// A single admitted edit, as stored in the event window
#[derive(Debug, Clone)]
pub struct EditEvent {
    /// Unix timestamp reported by the feed
    pub observed_at: i64,
    pub kind: ChangeKind,
    pub user: String,
    pub is_bot: bool,
    /// Page length after the change, in bytes
    pub new_len: u64,
}

/// Raw recent-change payload as delivered on the stream
///
/// Only the fields we aggregate on are decoded; everything else in the
/// payload is ignored. Missing fields default so a sparse payload still
/// decodes (currently unused upstream fields: id, namespace, title,
/// minor, patrolled).
#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(default)]
    wiki: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    user: String,
    #[serde(default)]
    bot: bool,
    #[serde(default)]
    length: Option<LengthChange>,
}

#[derive(Debug, Deserialize)]
struct LengthChange {
    #[serde(default)]
    new: Option<i64>,
}

/// Decode a stream payload and apply the admission filter
///
/// Returns `None` for malformed payloads (expected noise on the feed),
/// changes on other wikis, and change kinds we do not track. Callers
/// must not escalate a `None` result.
pub fn decode_change(data: &str, wiki: &str) -> Option<EditEvent> {
    let raw: RawChange = serde_json::from_str(data).ok()?;

    if raw.wiki != wiki {
        return None;
    }

    let kind = ChangeKind::from_raw(&raw.kind)?;

    Some(EditEvent {
        observed_at: raw.timestamp,
        kind,
        user: raw.user,
        is_bot: raw.bot,
        new_len: raw.length.and_then(|l| l.new).unwrap_or(0).max(0) as u64,
    })
}

/// Helper to get current Unix timestamp
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
