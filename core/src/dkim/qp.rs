/*
 * qp.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Postino, an asynchronous SMTP submission client.
 *
 * Postino is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Postino is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Postino.  If not, see <http://www.gnu.org/licenses/>.
 */

//! DKIM quoted-printable (RFC 6376 §2.11): a restricted QP used inside
//! `DKIM-Signature` tag values (`d=`, `i=`, `s=`, and `z=`). Unlike MIME QP
//! there is no line-length handling; `;` and `=` are always escaped, and the
//! `|` list separator is additionally escaped inside `z=`.

/// Escape a tag value. `escape_pipe` is set for `z=` values, where `|`
/// separates copied headers and must become `=7C`.
pub fn dkim_quoted_printable(input: &str, escape_pipe: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        let safe = (0x21..=0x7e).contains(&b)
            && b != b';'
            && b != b'='
            && !(escape_pipe && b == b'|');
        if safe {
            out.push(b as char);
        } else {
            out.push_str(&format!("={:02X}", b));
        }
    }
    out
}
