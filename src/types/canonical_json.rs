/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-exact canonical JSON.
//!
//! The canonical encoding of a [`VisibleBlocks`](super::visible_blocks::VisibleBlocks) is what gets
//! hashed to produce its storage key, so every byte of it is part of the persisted format. Entries
//! written by earlier deployments were produced by a serializer with the following behavior, which
//! [`CanonicalFormatter`] reproduces on top of [`serde_json`]:
//! 1. No insignificant whitespace: `,` and `:` separators only.
//! 2. Every non-ASCII code point (and DEL) is written as a lowercase `\uXXXX` escape, with code points
//!    outside the Basic Multilingual Plane written as a UTF-16 surrogate pair.
//! 3. Floats are written with the shortest digit string that round-trips, in fixed notation when
//!    `1e-4 <= |x| < 1e16` (always with a fractional part, e.g. `10.0`) and in exponent notation
//!    otherwise, with a signed, at least two-digit exponent (e.g. `1e-05`, `1.5e+16`).
//!
//! Object keys are written in the order the value's `Serialize` implementation emits them. Types
//! encoded canonically (i.e., [`BlockRecord`](super::block_record::BlockRecord)) emit their fields
//! in lexicographic order.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;

/// A compact [`Formatter`] that escapes to ASCII and formats floats as described in the
/// [module-level docs](self).
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        // serde_json routes NaN and infinities to `write_null` before reaching here.
        writer.write_all(float_repr(value).as_bytes())
    }

    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.write_f64(writer, value as f64)
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(fragment[start..index].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize `value` into its canonical JSON string.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    // The formatter only ever writes ASCII.
    String::from_utf8(buf).map_err(<serde_json::Error as serde::ser::Error>::custom)
}

/// Format a finite `value` with the shortest round-tripping digits, switching to exponent notation
/// outside `1e-4 <= |x| < 1e16`.
pub(crate) fn float_repr(value: f64) -> String {
    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e-5" or "0e0".
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    // Position of the decimal point relative to the start of `digits`.
    let decimal_point = exponent + 1;

    let mut out = String::with_capacity(digits.len() + 8);
    if value.is_sign_negative() {
        out.push('-');
    }

    if decimal_point > -4 && decimal_point <= 16 {
        if decimal_point <= 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-decimal_point) as usize));
            out.push_str(&digits);
        } else if decimal_point as usize >= digits.len() {
            out.push_str(&digits);
            out.extend(std::iter::repeat('0').take(decimal_point as usize - digits.len()));
            out.push_str(".0");
        } else {
            let (integral, fractional) = digits.split_at(decimal_point as usize);
            out.push_str(integral);
            out.push('.');
            out.push_str(fractional);
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let shown_exponent = decimal_point - 1;
        out.push('e');
        out.push(if shown_exponent < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", shown_exponent.abs()));
    }

    out
}
