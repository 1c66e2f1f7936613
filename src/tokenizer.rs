// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Zero-copy tokenizer (spec.md §4.2). Splits a raw message buffer on a
//! configurable delimiter, routing each `tag=value` pair into a promoted hot
//! slot, the overflow map, or the ordered tag sequence — all as borrowed
//! slices into the caller's buffer.

use std::collections::HashMap;

/// The 19 tags promoted to dedicated output columns (spec.md §3).
pub const HOT_TAGS: [u32; 19] = [
    35, 49, 56, 34, 52, 11, 37, 17, 55, 54, 150, 39, 44, 38, 14, 151, 31, 32, 58,
];

fn hot_index(tag: u32) -> Option<usize> {
    HOT_TAGS.iter().position(|&t| t == tag)
}

/// A borrowed `(offset, len)` view into the message buffer.
pub type Span = (u32, u32);

/// The result of tokenizing one line. Borrows from the buffer it was built
/// from; the caller resolves spans back to `&[u8]` via [`ParsedMessage::slice`].
pub struct ParsedMessage<'a> {
    buf: &'a [u8],
    pub hot_slots: [Option<Span>; 19],
    pub overflow: HashMap<u32, Span>,
    pub ordered: Vec<(u32, Span)>,
    pub structural_error: Option<&'static str>,
}

impl<'a> ParsedMessage<'a> {
    pub fn slice(&self, span: Span) -> &'a [u8] {
        &self.buf[span.0 as usize..(span.0 + span.1) as usize]
    }

    pub fn hot(&self, tag: u32) -> Option<&'a [u8]> {
        let idx = hot_index(tag)?;
        self.hot_slots[idx].map(|span| self.slice(span))
    }

    pub fn overflow_value(&self, tag: u32) -> Option<&'a [u8]> {
        self.overflow.get(&tag).map(|span| self.slice(*span))
    }

    /// Value for `tag`, whether hot or overflow — used by custom-column
    /// resolution (spec.md §4.6 step 8), which doesn't care which bucket a
    /// tag landed in.
    pub fn any(&self, tag: u32) -> Option<&'a [u8]> {
        self.hot(tag).or_else(|| self.overflow_value(tag))
    }

    pub fn msg_type(&self) -> Option<&'a [u8]> {
        self.hot(35)
    }
}

/// Tokenize `buf` on `delimiter` into hot slots / overflow map / ordered
/// sequence. Never panics; all failure modes are recorded as the exact
/// diagnostic strings spec.md §4.2 specifies.
pub fn tokenize(buf: &[u8], delimiter: u8) -> ParsedMessage<'_> {
    let mut hot_slots: [Option<Span>; 19] = [None; 19];
    let mut overflow = HashMap::new();
    let mut ordered = Vec::new();

    if buf.is_empty() {
        return ParsedMessage {
            buf,
            hot_slots,
            overflow,
            ordered,
            structural_error: Some("Empty message"),
        };
    }

    let mut structural_error = None;
    let mut segment_count = 0usize;

    for segment in buf.split(|&b| b == delimiter) {
        if segment.is_empty() {
            continue;
        }
        segment_count += 1;

        let Some(eq_pos) = segment.iter().position(|&b| b == b'=') else {
            structural_error.get_or_insert("Invalid tag format (missing '=')");
            continue;
        };
        let tag_bytes = &segment[..eq_pos];
        let value_bytes = &segment[eq_pos + 1..];

        let Ok(tag_str) = std::str::from_utf8(tag_bytes) else {
            structural_error.get_or_insert("Failed to parse tag");
            continue;
        };
        let Ok(tag) = tag_str.parse::<u32>() else {
            structural_error.get_or_insert("Failed to parse tag");
            continue;
        };

        let base = offset_of(buf, value_bytes);
        let span: Span = (base, value_bytes.len() as u32);

        ordered.push((tag, span));
        if let Some(idx) = hot_index(tag) {
            hot_slots[idx] = Some(span);
        } else {
            overflow.insert(tag, span);
        }
    }

    if segment_count == 0 && structural_error.is_none() {
        structural_error = Some("No valid tags found");
    }

    if structural_error.is_none() && hot_slots[hot_index(35).unwrap()].is_none() {
        structural_error = Some("Missing required tag 35 (MsgType)");
    }

    ParsedMessage {
        buf,
        hot_slots,
        overflow,
        ordered,
        structural_error,
    }
}

/// Byte offset of `slice` within `buf`. Both originate from the same
/// allocation via `split`, so pointer arithmetic is always in range.
fn offset_of(buf: &[u8], slice: &[u8]) -> u32 {
    let buf_start = buf.as_ptr() as usize;
    let slice_start = slice.as_ptr() as usize;
    (slice_start - buf_start) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_is_reported() {
        let parsed = tokenize(b"", b'|');
        assert_eq!(parsed.structural_error, Some("Empty message"));
    }

    #[test]
    fn missing_equals_is_reported() {
        let parsed = tokenize(b"35", b'|');
        assert_eq!(parsed.structural_error, Some("Invalid tag format (missing '=')"));
    }

    #[test]
    fn non_numeric_tag_is_reported() {
        let parsed = tokenize(b"abc=1", b'|');
        assert_eq!(parsed.structural_error, Some("Failed to parse tag"));
    }

    #[test]
    fn missing_msg_type_is_reported() {
        let parsed = tokenize(b"49=S|56=T|11=A", b'|');
        assert_eq!(
            parsed.structural_error,
            Some("Missing required tag 35 (MsgType)")
        );
        assert_eq!(parsed.hot(49), Some(&b"S"[..]));
    }

    #[test]
    fn basic_order_routes_hot_and_overflow() {
        let line = b"8=FIX.4.4|9=100|35=D|49=S|56=T|34=1|52=20231215-10:30:00|11=A|55=AAPL|54=1|38=100|44=150.50|10=000";
        let parsed = tokenize(line, b'|');
        assert_eq!(parsed.structural_error, None);
        assert_eq!(parsed.hot(35), Some(&b"D"[..]));
        assert_eq!(parsed.hot(49), Some(&b"S"[..]));
        assert_eq!(parsed.overflow_value(8), Some(&b"FIX.4.4"[..]));
        assert_eq!(parsed.overflow_value(9), Some(&b"100"[..]));
        assert_eq!(parsed.overflow_value(10), Some(&b"000"[..]));
        assert!(HOT_TAGS.iter().all(|t| !parsed.overflow.contains_key(t)));
    }

    #[test]
    fn duplicate_non_hot_tag_keeps_last_in_overflow_but_both_in_ordered() {
        let parsed = tokenize(b"35=D|90=first|90=second", b'|');
        assert_eq!(parsed.overflow_value(90), Some(&b"second"[..]));
        let occurrences = parsed.ordered.iter().filter(|(t, _)| *t == 90).count();
        assert_eq!(occurrences, 2);
    }
}
