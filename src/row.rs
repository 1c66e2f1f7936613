// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! The output row schema (spec.md §6): 19 typed hot columns, two container
//! columns (`tags`, `groups`), two diagnostic columns (`raw_message`,
//! `parse_error`), then N custom columns declared at bind time.

use chrono::NaiveDateTime;

/// The 23 fixed column names, in schema order (spec.md §6 table).
pub const FIXED_COLUMNS: [&str; 23] = [
    "MsgType",
    "SenderCompID",
    "TargetCompID",
    "MsgSeqNum",
    "SendingTime",
    "ClOrdID",
    "OrderID",
    "ExecID",
    "Symbol",
    "Side",
    "ExecType",
    "OrdStatus",
    "Price",
    "OrderQty",
    "CumQty",
    "LeavesQty",
    "LastPx",
    "LastQty",
    "Text",
    "tags",
    "groups",
    "raw_message",
    "parse_error",
];

/// One value in a row. Container/scalar shapes match spec.md §6's column
/// type table exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    /// `raw_message`: the exact input line bytes after terminator stripping
    /// (P4), independent of whether the line is valid UTF-8.
    Bytes(Vec<u8>),
    /// `tags`: overflow tag -> string value.
    TagMap(Vec<(u32, String)>),
    /// `groups`: count-tag -> list of (member-tag -> string value) instances.
    Groups(Vec<(u32, Vec<Vec<(u32, String)>>)>),
}

/// One assembled output row: fixed columns in schema order, then custom
/// columns in declared order.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub fixed: Vec<Value>,
    pub custom: Vec<Value>,
}

/// A batch of assembled rows, the unit the scan iterator yields.
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn with_capacity(cap: usize) -> Self {
        RowBatch {
            rows: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
