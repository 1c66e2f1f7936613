// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Bind/parameter layer (spec.md §4.6 bind phase, §6 table function surface).
//! Validates options, resolves the dictionary and custom columns, and
//! precomputes the projection mapping the scan driver walks per row.

use std::sync::Arc;

use crate::dictionary::embedded::embedded_fix44;
use crate::dictionary::model::Dictionary;
use crate::error::BindError;
use crate::framer::FileCursor;
use crate::row::FIXED_COLUMNS;

const DEFAULT_BATCH_SIZE: usize = 2048;

/// Configuration the host (table function binder, or the CLI) populates
/// before a scan. Mirrors spec.md §6's "Named options" list.
#[derive(Debug, Clone, Default)]
pub struct BindOptions {
    /// Glob pattern(s) for the input log files.
    pub paths: Vec<String>,
    /// Path to an XML dictionary; `None` uses the embedded FIX-4.4 default.
    pub dictionary_path: Option<String>,
    /// An additional overlay XML applied on top of the base dictionary.
    pub overlay_path: Option<String>,
    /// `delimiter` option: single char literal, `"SOH"`, `"\x01"`, or a hex
    /// byte like `"0x01"`. Defaults to `|` (spec.md §6 default).
    pub delimiter: Option<String>,
    /// `rtags`: field names resolved against the dictionary (bind error if
    /// unknown).
    pub rtags: Vec<String>,
    /// `tagIds`: tag numbers, accepted even if unknown to the dictionary
    /// (named `Tag<N>`).
    pub tag_ids: Vec<u32>,
    /// Column names the caller actually wants; `None` means "all columns"
    /// (no pushdown). Fixed-column names must match [`FIXED_COLUMNS`];
    /// unrecognized names are ignored rather than rejected, since this is an
    /// optimization hint, not a schema contract.
    pub projected_columns: Option<Vec<String>>,
    /// Row batch capacity; spec.md leaves "standard capacity" unspecified so
    /// this crate defaults to 2048 and lets callers override it.
    pub batch_size: Option<usize>,
}

/// A custom column declared at bind time: output name plus the tag it reads.
#[derive(Debug, Clone)]
pub struct CustomColumn {
    pub name: String,
    pub tag: u32,
}

/// Precomputed projection: which of the 23 fixed columns are needed.
#[derive(Debug, Clone)]
pub struct Projection {
    needed: [bool; 23],
}

impl Projection {
    fn all() -> Self {
        Projection { needed: [true; 23] }
    }

    fn from_names(names: &[String]) -> Self {
        let mut needed = [false; 23];
        for name in names {
            if let Some(idx) = FIXED_COLUMNS.iter().position(|c| c == name) {
                needed[idx] = true;
            }
        }
        Projection { needed }
    }

    pub fn wants(&self, column_index: usize) -> bool {
        self.needed[column_index]
    }

    pub fn wants_tags(&self) -> bool {
        self.needed[19]
    }

    pub fn wants_groups(&self) -> bool {
        self.needed[20]
    }
}

/// The result of a successful bind: everything the scan phase needs, with no
/// further fallible steps between here and row production.
pub struct BoundScan {
    pub dictionary: Arc<Dictionary>,
    pub delimiter: u8,
    pub custom_columns: Vec<CustomColumn>,
    pub projection: Projection,
    pub cursor: FileCursor,
    pub batch_size: usize,
}

pub fn bind(opts: BindOptions) -> Result<BoundScan, BindError> {
    let files = expand_paths(&opts.paths)?;

    let mut dictionary = load_dictionary(opts.dictionary_path.as_deref())?;
    if let Some(overlay_path) = &opts.overlay_path {
        let xml = std::fs::read_to_string(overlay_path).map_err(|source| BindError::DictionaryIo {
            path: overlay_path.clone(),
            source,
        })?;
        dictionary.apply_overlay(&xml)?;
    }

    let delimiter = parse_delimiter(opts.delimiter.as_deref())?;
    let custom_columns = resolve_custom_columns(&opts.rtags, &opts.tag_ids, &dictionary)?;

    let projection = match &opts.projected_columns {
        Some(names) => Projection::from_names(names),
        None => Projection::all(),
    };

    Ok(BoundScan {
        dictionary: Arc::new(dictionary),
        delimiter,
        custom_columns,
        projection,
        cursor: FileCursor::new(files),
        batch_size: opts.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
    })
}

fn expand_paths(patterns: &[String]) -> Result<Vec<String>, BindError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|e| BindError::BadGlob(pattern.clone(), e))?;
        for entry in matches {
            match entry {
                Ok(path) => files.push(path.to_string_lossy().into_owned()),
                Err(e) => log::warn!("skipping unreadable glob entry: {e}"),
            }
        }
    }
    if files.is_empty() {
        return Err(BindError::EmptyGlob(patterns.join(", ")));
    }
    Ok(files)
}

fn load_dictionary(path: Option<&str>) -> Result<Dictionary, BindError> {
    match path {
        Some(path) => {
            let xml = std::fs::read_to_string(path).map_err(|source| BindError::DictionaryIo {
                path: path.to_string(),
                source,
            })?;
            Ok(Dictionary::from_xml(&xml)?)
        }
        None => Ok(Dictionary::from_xml(embedded_fix44())?),
    }
}

/// Parse the `delimiter` option (spec.md §4.6 step 3 / §6): a single-char
/// literal, the token `"SOH"`, an escape like `"\x01"`, or a `0x01` hex byte.
/// Grounded in the teacher's `main.rs::parse_delimiter`.
fn parse_delimiter(opt: Option<&str>) -> Result<u8, BindError> {
    let Some(raw) = opt else {
        return Ok(b'|');
    };
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("soh") {
        return Ok(0x01);
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|_| BindError::InvalidDelimiter(raw.to_string()));
    }
    if let Some(hex) = trimmed.strip_prefix("\\x") {
        return u8::from_str_radix(hex, 16).map_err(|_| BindError::InvalidDelimiter(raw.to_string()));
    }
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(BindError::InvalidDelimiter(raw.to_string())),
    }
}

fn resolve_custom_columns(
    rtags: &[String],
    tag_ids: &[u32],
    dictionary: &Dictionary,
) -> Result<Vec<CustomColumn>, BindError> {
    let mut seen = std::collections::HashSet::new();
    let mut columns = Vec::new();

    for name in rtags {
        let tag = *dictionary
            .name_to_tag
            .get(name)
            .ok_or_else(|| BindError::UnknownFieldName(name.clone()))?;
        if seen.insert(tag) {
            columns.push(CustomColumn { name: name.clone(), tag });
        }
    }

    for &tag in tag_ids {
        if !seen.insert(tag) {
            continue;
        }
        let name = dictionary
            .fields
            .get(&tag)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("Tag{tag}"));
        columns.push(CustomColumn { name, tag });
    }

    Ok(columns)
}
