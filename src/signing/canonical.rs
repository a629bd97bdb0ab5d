// ============================================================================
// Canonical Payload Encoding
// The byte string every platform scheme verifies a signature against
// ============================================================================
//
// Format (fixed, documented, deterministic):
//
//   {"sender_pk": "...", "receiver_pk": "...", "buy_currency": "...",
//    "sell_currency": "...", "buy_amount": N, "sell_amount": N, "platform": "..."}
//
// - members in exactly the order above, nothing else (extra payload keys are
//   not signed)
// - ", " between members, ": " between key and value, no trailing newline
// - strings escape `"` `\` and the short control escapes; every other
//   character outside printable ASCII becomes \uXXXX (lowercase hex, UTF-16
//   surrogate pairs above U+FFFF)
// - amounts are the JSON number text as received, so `100` and `100.0` sign
//   differently

use crate::domain::OrderPayload;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Number;
use std::io;

/// The seven signed members, in signing order.
#[derive(Serialize)]
struct SignedMembers<'a> {
    sender_pk: &'a str,
    receiver_pk: &'a str,
    buy_currency: &'a str,
    sell_currency: &'a str,
    buy_amount: &'a Number,
    sell_amount: &'a Number,
    platform: &'a str,
}

impl<'a> From<&'a OrderPayload> for SignedMembers<'a> {
    fn from(payload: &'a OrderPayload) -> Self {
        Self {
            sender_pk: &payload.sender_pk,
            receiver_pk: &payload.receiver_pk,
            buy_currency: &payload.buy_currency,
            sell_currency: &payload.sell_currency,
            buy_amount: &payload.buy_amount.text,
            sell_amount: &payload.sell_amount.text,
            platform: &payload.platform,
        }
    }
}

/// Compact JSON with spaced separators and ASCII-only strings.
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    /// Quotes, backslashes and control characters never reach here; serde_json
    /// escapes them itself.
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if matches!(c, ' '..='~') {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

pub fn encode_payload(payload: &OrderPayload) -> serde_json::Result<String> {
    let mut out = Vec::with_capacity(256);
    let mut serializer = Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    SignedMembers::from(payload).serialize(&mut serializer)?;
    String::from_utf8(out).map_err(<serde_json::Error as serde::ser::Error>::custom)
}
