use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Records past this index are never placed, registered, or drawn.
pub const MAX_VISIBLE_RECORDS: usize = 160;

/// Labels show at most this many glyphs of a name.
pub const DISPLAY_NAME_GLYPHS: usize = 22;

const MOJIBAKE: [(&str, &str); 9] = [
    ("â€™", "'"),
    ("â€œ", "\""),
    ("â€“", "-"),
    ("â€”", "-"),
    ("â€¦", "..."),
    ("â€˜", "'"),
    ("â€¢", "-"),
    ("â€", "\""),
    ("Â", ""),
];

/// One memorial entry as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    #[serde(rename = "agent_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "epitaph", alias = "text", default)]
    pub text: String,
    #[serde(rename = "last_post_title", alias = "note", default)]
    pub note: Option<String>,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), text: text.into(), note: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.name.chars().take(DISPLAY_NAME_GLYPHS).collect()
    }

    /// Glyph count of the body text, the magnitude the layout sizes markers by.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    fn normalized(self) -> Option<Self> {
        let id = normalize_text(&self.id);
        let name = normalize_text(&self.name);
        if id.is_empty() || name.is_empty() {
            return None;
        }
        let note = self.note.map(|note| normalize_text(&note)).filter(|note| !note.is_empty());
        Some(Self { id, name, text: normalize_text(&self.text), note })
    }
}

/// The leading slice of `records` that receives markers.
pub fn visible(records: &[Record], cap: usize) -> &[Record] {
    &records[..records.len().min(cap)]
}

/// Repairs common double-encoded UTF-8 sequences and strips control characters.
pub fn normalize_text(raw: &str) -> String {
    let mut text = raw.to_string();
    for (bad, good) in MOJIBAKE {
        if text.contains(bad) {
            text = text.replace(bad, good);
        }
    }
    text.chars().filter(|ch| *ch != '\u{fffd}' && !ch.is_control()).collect::<String>().trim().to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read records from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse records in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record loader stopped before replying")]
    Abandoned,
}

pub trait RecordSource {
    fn load_records(&self) -> Result<Vec<Record>, LoadError>;
}

/// Reads a JSON array of records from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonFileSource {
    fn load_records(&self) -> Result<Vec<Record>, LoadError> {
        let bytes =
            fs::read(&self.path).map_err(|source| LoadError::Io { path: self.path.clone(), source })?;
        parse_records(&bytes).map_err(|source| LoadError::Parse { path: self.path.clone(), source })
    }
}

pub fn parse_records(bytes: &[u8]) -> Result<Vec<Record>, serde_json::Error> {
    let raw: Vec<Record> = serde_json::from_slice(bytes)?;
    let total = raw.len();
    let records: Vec<Record> = raw.into_iter().filter_map(Record::normalized).collect();
    if records.len() < total {
        log::warn!("skipped {} records without an id or name", total - records.len());
    }
    Ok(records)
}

/// A record load running off the frame loop. The result is delivered at most
/// once and never after `cancel`.
pub struct PendingLoad {
    receiver: Option<Receiver<Result<Vec<Record>, LoadError>>>,
    cancelled: Arc<AtomicBool>,
}

impl PendingLoad {
    pub fn spawn<S>(source: S) -> Self
    where
        S: RecordSource + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_cancelled = Arc::clone(&cancelled);
        thread::spawn(move || {
            let result = source.load_records();
            if !worker_cancelled.load(Ordering::Acquire) {
                let _ = sender.send(result);
            }
        });
        Self { receiver: Some(receiver), cancelled }
    }

    /// Wraps an already available result; used when the source is synchronous.
    pub fn ready(result: Result<Vec<Record>, LoadError>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(result);
        Self { receiver: Some(receiver), cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn poll(&mut self) -> Option<Result<Vec<Record>, LoadError>> {
        if self.is_cancelled() {
            self.receiver = None;
            return None;
        }
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(LoadError::Abandoned))
            }
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.receiver = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.receiver.is_none()
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_field_names_and_aliases() {
        let json = br#"[
            {"agent_id": "a1", "name": "Shell", "epitaph": "rest", "last_post_title": "hello"},
            {"id": "a2", "name": "Claw", "text": "gone"},
            {"agent_id": "a3", "name": "Quiet"}
        ]"#;
        let records = parse_records(json).expect("records parse");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].note.as_deref(), Some("hello"));
        assert_eq!(records[1].id, "a2");
        assert_eq!(records[1].text, "gone");
        assert!(records[2].text.is_empty());
        assert!(records[2].note.is_none());
    }

    #[test]
    fn skips_records_without_identity() {
        let json = br#"[{"agent_id": "  ", "name": "Ghost"}, {"agent_id": "b", "name": "\u0007"}]"#;
        let records = parse_records(json).expect("records parse");
        assert!(records.is_empty());
    }

    #[test]
    fn normalize_repairs_mojibake_and_controls() {
        assert_eq!(normalize_text("  it\u{e2}\u{20ac}\u{2122}s\u{7} done \u{fffd}"), "it's done");
        assert_eq!(normalize_text("plain"), "plain");
    }

    #[test]
    fn display_name_truncates_by_glyph() {
        let record = Record::new("x", "ABCDEFGHIJKLMNOPQRSTUVWXYZ", "");
        assert_eq!(record.display_name(), "ABCDEFGHIJKLMNOPQRSTUV");
        let short = Record::new("y", "Molt", "");
        assert_eq!(short.display_name(), "Molt");
    }

    #[test]
    fn visible_caps_to_first_entries() {
        let records: Vec<Record> = (0..5).map(|i| Record::new(i.to_string(), "n", "")).collect();
        assert_eq!(visible(&records, 3).len(), 3);
        assert_eq!(visible(&records, 10).len(), 5);
    }

    #[test]
    fn cancelled_load_never_delivers() {
        let mut pending = PendingLoad::ready(Ok(vec![Record::new("a", "A", "")]));
        pending.cancel();
        assert!(pending.poll().is_none());
        assert!(pending.is_finished());
    }

    #[test]
    fn ready_load_delivers_once() {
        let mut pending = PendingLoad::ready(Ok(vec![Record::new("a", "A", "")]));
        assert!(matches!(pending.poll(), Some(Ok(records)) if records.len() == 1));
        assert!(pending.poll().is_none());
    }
}
