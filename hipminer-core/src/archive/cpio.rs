use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::ArchiveFormatError;
use crate::types::ArchiveEntry;

const NEWC_MAGIC: &[u8] = b"070701";
const TRAILER: &str = "TRAILER!!!";
/// Magic (6) plus thirteen 8-byte ASCII-hex fields.
const HEADER_LEN: usize = 110;
/// How far into the buffer we search for a displaced magic.
const MAGIC_SCAN_WINDOW: usize = 256;

// Field offsets within the thirteen 8-byte hex fields after the magic.
const FIELD_MODE: usize = 1;
const FIELD_FILESIZE: usize = 6;
const FIELD_NAMESIZE: usize = 11;

/// Decode a HIP container into its archive entries, in file order.
///
/// Handles the optional gzip wrapper, the optional 4-byte Houdini prefix, and
/// rare garbage between entries (resynchronization by forward magic search).
/// Truncated archives yield the decodable prefix silently; a missing magic or
/// non-hex header aborts with an [`ArchiveFormatError`].
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveFormatError> {
    let decompressed = maybe_gunzip(bytes)?;
    let body = skip_houdini_prefix(&decompressed)?;
    parse_entries(body)
}

/// Decompress when a gzip stream is present — either at the start or behind
/// Houdini's 4-byte compressed-content prefix.
fn maybe_gunzip(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ArchiveFormatError> {
    let stream = if is_gzip(bytes) {
        bytes
    } else if bytes.len() > 4 && is_gzip(&bytes[4..]) {
        &bytes[4..]
    } else {
        return Ok(Cow::Borrowed(bytes));
    };
    let mut out = Vec::new();
    GzDecoder::new(stream)
        .read_to_end(&mut out)
        .map_err(|e| ArchiveFormatError::Gzip(e.to_string()))?;
    Ok(Cow::Owned(out))
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1F && bytes[1] == 0x8B
}

/// Locate the first CPIO header. Houdini prepends a 4-byte marker to the
/// compressed content; some exporters add other small prefixes, so as a last
/// resort the leading window is scanned for the magic.
fn skip_houdini_prefix(buf: &[u8]) -> Result<&[u8], ArchiveFormatError> {
    if buf.len() >= 6 && &buf[..6] == NEWC_MAGIC {
        return Ok(buf);
    }
    if buf.len() >= 10 && &buf[4..10] == NEWC_MAGIC {
        return Ok(&buf[4..]);
    }
    let window = &buf[..buf.len().min(MAGIC_SCAN_WINDOW)];
    if let Some(pos) = find_magic(window, 0) {
        debug!(offset = pos, "CPIO magic found after unknown prefix");
        return Ok(&buf[pos..]);
    }
    Err(ArchiveFormatError::NoMagic)
}

fn find_magic(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(NEWC_MAGIC.len())
        .position(|w| w == NEWC_MAGIC)
        .map(|p| p + from)
}

fn parse_entries(buf: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveFormatError> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    loop {
        if offset + HEADER_LEN > buf.len() {
            // Truncated header: return what we have.
            break;
        }
        if &buf[offset..offset + 6] != NEWC_MAGIC {
            // Mid-archive garbage: resynchronize on the next magic, or stop.
            match find_magic(buf, offset + 1) {
                Some(pos) => {
                    debug!(from = offset, to = pos, "resynchronized on CPIO magic");
                    offset = pos;
                    continue;
                }
                None => break,
            }
        }

        let header = &buf[offset..offset + HEADER_LEN];
        let mode = hex_field(header, FIELD_MODE, offset)?;
        let filesize = hex_field(header, FIELD_FILESIZE, offset)? as usize;
        let namesize = hex_field(header, FIELD_NAMESIZE, offset)? as usize;

        let name_start = offset + HEADER_LEN;
        let name_end = match name_start.checked_add(namesize) {
            Some(end) if end <= buf.len() => end,
            _ => break,
        };
        let raw_name = &buf[name_start..name_end];
        // namesize counts the terminating NUL.
        let name_bytes = raw_name.strip_suffix(&[0u8]).unwrap_or(raw_name);
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        if name == TRAILER {
            break;
        }

        // Header + name padded to 4 bytes, then payload padded to 4 bytes.
        let data_start = offset + align4(HEADER_LEN + namesize);
        let data_end = match data_start.checked_add(filesize) {
            Some(end) if end <= buf.len() => end,
            _ => break,
        };

        entries.push(ArchiveEntry {
            path: name,
            mode,
            size: filesize as u64,
            data: buf[data_start..data_end].to_vec(),
        });

        offset = data_start + align4(filesize);
    }

    Ok(entries)
}

fn hex_field(header: &[u8], index: usize, entry_offset: usize) -> Result<u32, ArchiveFormatError> {
    let start = 6 + index * 8;
    let field = &header[start..start + 8];
    let text = std::str::from_utf8(field).map_err(|_| ArchiveFormatError::BadHeader {
        offset: entry_offset,
        message: format!("non-ASCII header field at +{start}"),
    })?;
    u32::from_str_radix(text, 16).map_err(|_| ArchiveFormatError::BadHeader {
        offset: entry_offset,
        message: format!("non-hex header field {text:?} at +{start}"),
    })
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}
