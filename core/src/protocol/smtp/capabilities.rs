/*
 * capabilities.rs
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

//! EHLO capability parsing: SIZE, AUTH, STARTTLS, PIPELINING, 8BITMIME.

use std::collections::HashSet;

use super::reply::Reply;

/// Feature set advertised by the server in its EHLO response. Reparsed after
/// STARTTLS, since servers commonly advertise a different set inside TLS.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// First line of the EHLO reply (server greeting text).
    pub ehlo_greet: String,
    /// Advertised maximum message size; 0 means unlimited or not advertised
    /// with a value.
    pub size: usize,
    /// Advertised AUTH mechanism names, uppercased.
    pub auth: Vec<String>,
    pub starttls: bool,
    pub pipelining: bool,
    pub eight_bit_mime: bool,
}

impl Capabilities {
    /// Parse from an EHLO reply. The first line is the greeting; subsequent
    /// lines are one keyword each, optionally with parameters.
    pub fn parse(reply: &Reply) -> Self {
        let mut caps = Capabilities::default();
        let mut seen_auth = HashSet::new();
        for (pos, line) in reply.lines.iter().enumerate() {
            if pos == 0 {
                caps.ehlo_greet = line.clone();
                continue;
            }
            let line = line.trim();
            // Some servers send the obsolete "AUTH=PLAIN LOGIN" form.
            let line = if let Some(rest) = line.strip_prefix("AUTH=") {
                format!("AUTH {}", rest)
            } else {
                line.to_string()
            };
            let mut words = line.split_whitespace();
            let keyword = match words.next() {
                Some(k) => k.to_uppercase(),
                None => continue,
            };
            match keyword.as_str() {
                "STARTTLS" => caps.starttls = true,
                "PIPELINING" => caps.pipelining = true,
                "8BITMIME" => caps.eight_bit_mime = true,
                "SIZE" => {
                    caps.size = words
                        .next()
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                }
                "AUTH" => {
                    for word in words {
                        let name = word.to_uppercase();
                        if seen_auth.insert(name.clone()) {
                            caps.auth.push(name);
                        }
                    }
                }
                _ => {}
            }
        }
        caps
    }

    pub fn supports_auth(&self, name: &str) -> bool {
        self.auth.iter().any(|m| m == name)
    }
}
