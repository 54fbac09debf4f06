use crate::record::Record;

pub const MAX_SUGGESTIONS: usize = 8;

/// Records whose name contains `query`, case-insensitively, in input order.
/// An empty query suggests nothing.
pub fn filter_by_name<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    records.iter().filter(|record| record.name.to_lowercase().contains(&needle)).take(MAX_SUGGESTIONS).collect()
}
