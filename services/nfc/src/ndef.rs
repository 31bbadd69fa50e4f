//! NDEF text records and UID extraction
//!
//! Text record payload layout: one status byte (bit 7 set for UTF-16, bits
//! 0-5 the language code length), the language code, then the text.

use crate::error::{NfcError, NfcResult};
use crate::reader::{NdefRecord, NfcTag, RecordType};

const UTF16_FLAG: u8 = 0x80;
const LANG_LEN_MASK: u8 = 0x3f;

/// Build a UTF-8 text record
pub fn text_record(text: &str, language: &str) -> NfcResult<NdefRecord> {
    let lang = language.as_bytes();
    if lang.len() > LANG_LEN_MASK as usize {
        return Err(NfcError::Malformed(format!(
            "language code too long: {}",
            language
        )));
    }

    let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
    payload.push(lang.len() as u8);
    payload.extend_from_slice(lang);
    payload.extend_from_slice(text.as_bytes());

    Ok(NdefRecord {
        record_type: RecordType::Text,
        payload,
    })
}

/// Decode the text out of a text record payload
pub fn decode_text(payload: &[u8]) -> NfcResult<String> {
    let (&status, rest) = payload
        .split_first()
        .ok_or_else(|| NfcError::Malformed("empty text record".to_string()))?;

    let lang_len = (status & LANG_LEN_MASK) as usize;
    if rest.len() < lang_len {
        return Err(NfcError::Malformed(
            "language code longer than payload".to_string(),
        ));
    }
    let text = &rest[lang_len..];

    if status & UTF16_FLAG == 0 {
        return String::from_utf8(text.to_vec()).map_err(|e| NfcError::Malformed(e.to_string()));
    }

    if text.len() % 2 != 0 {
        return Err(NfcError::Malformed("odd-length UTF-16 text".to_string()));
    }
    let little_endian = text.starts_with(&[0xff, 0xfe]);
    let units: Vec<u16> = text
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .filter(|unit| *unit != 0xfeff)
        .collect();
    String::from_utf16(&units).map_err(|e| NfcError::Malformed(e.to_string()))
}

/// UID of a scanned tag: the hardware id as uppercase hex, else the first text record
pub fn uid_from_tag(tag: &NfcTag) -> NfcResult<String> {
    if let Some(id) = tag.id.as_deref().filter(|id| !id.is_empty()) {
        return Ok(hex::encode_upper(id));
    }

    for record in tag.records.iter().filter(|r| r.record_type == RecordType::Text) {
        let text = decode_text(&record.payload)?;
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
    }

    Err(NfcError::NoIdentifier)
}
