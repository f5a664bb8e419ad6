//! Line codec for the file log
//!
//! ## Line Format
//! ```text
//! ┌──────────┬───┬──────┬───┬─────┬───┬───────┬───┬───────────┬────┐
//! │ sequence │\t │ type │\t │ key │\t │ value │\t │ crc32 hex │ \n │
//! └──────────┴───┴──────┴───┴─────┴───┴───────┴───┴───────────┴────┘
//! ```
//!
//! Key and value are escaped so they never contain a raw tab or newline.
//! The checksum covers everything before the final tab.

use crate::error::{KvError, Result};

use super::{Event, EventType};

const FIELD_SEP: char = '\t';

/// Encode a persisted event as a single newline-terminated line
pub fn encode_line(event: &Event) -> String {
    let body = format!(
        "{}{sep}{}{sep}{}{sep}{}",
        event.sequence,
        event.event_type.as_u8(),
        escape(&event.key),
        escape(&event.value),
        sep = FIELD_SEP,
    );
    let crc = crc32fast::hash(body.as_bytes());
    format!("{}{}{:08x}\n", body, FIELD_SEP, crc)
}

/// Decode one line (without its trailing newline)
///
/// `line_no` is 1-based and only used for error reporting.
pub fn decode_line(line_no: u64, line: &str) -> Result<Event> {
    let corrupt = |reason: &str| KvError::Corrupt {
        line: line_no,
        reason: reason.to_string(),
    };

    let line = line.strip_suffix('\r').unwrap_or(line);
    let (body, crc_hex) = line
        .rsplit_once(FIELD_SEP)
        .ok_or_else(|| corrupt("missing checksum"))?;

    let expected = u32::from_str_radix(crc_hex, 16).map_err(|_| corrupt("malformed checksum"))?;
    if crc32fast::hash(body.as_bytes()) != expected {
        return Err(corrupt("checksum mismatch"));
    }

    let fields: Vec<&str> = body.split(FIELD_SEP).collect();
    if fields.len() != 4 {
        return Err(corrupt(&format!("expected 4 fields, found {}", fields.len())));
    }

    let sequence: u64 = fields[0].parse().map_err(|_| corrupt("malformed sequence"))?;
    let raw_type: u8 = fields[1].parse().map_err(|_| corrupt("malformed event type"))?;
    let event_type = EventType::try_from(raw_type)?;

    let key = unescape(fields[2]).ok_or_else(|| corrupt("bad escape in key"))?;
    let value = unescape(fields[3]).ok_or_else(|| corrupt("bad escape in value"))?;

    Ok(Event {
        sequence,
        event_type,
        key,
        value,
    })
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(escaped: &str) -> Option<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}
