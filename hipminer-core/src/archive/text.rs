use crate::types::ArchiveEntry;

/// How many leading bytes are inspected when classifying an entry.
const SNIFF_LEN: usize = 512;

/// Classify an archive entry as text.
///
/// Text means: non-empty, and every byte of the first `min(512, size)` bytes
/// is a tab, newline, carriage return, or printable ASCII. Geometry and
/// texture payloads fail this within the first few bytes.
pub fn is_text_entry(entry: &ArchiveEntry) -> bool {
    if entry.data.is_empty() {
        return false;
    }
    let prefix = &entry.data[..entry.data.len().min(SNIFF_LEN)];
    prefix
        .iter()
        .all(|&b| matches!(b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E))
}
