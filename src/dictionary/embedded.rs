// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! The built-in FIX-4.4 dictionary, compiled into the binary as a byte array
//! (spec.md §9 "embedded default dictionary") so the crate has no runtime
//! file dependency and so large dictionary XML never runs into per-platform
//! string-literal limits.

static FIX44_XML: &[u8] = include_bytes!("../../resources/FIX44.xml");

/// The embedded FIX-4.4 dictionary XML, as UTF-8 text.
///
/// The bytes are checked-in ASCII XML; this never panics for the shipped
/// resource, but callers loading a replacement resource at this path should
/// still treat a bad embed as a build-time mistake, not a runtime one.
pub fn embedded_fix44() -> &'static str {
    std::str::from_utf8(FIX44_XML).expect("embedded FIX44.xml must be valid UTF-8")
}
