// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Scan driver (spec.md §4.6 scan phase, §5 cancellation). Streams lines
//! across the bound file list, tokenizes, coerces projected hot columns,
//! materializes `tags`/`groups` only when projected, and assembles rows into
//! batches up to the bound capacity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bind::BoundScan;
use crate::coercion::{parse_float, parse_int, parse_timestamp};
use crate::error::ScanIoError;
use crate::framer::LineFramer;
use crate::groups::parse_groups;
use crate::row::{Row, RowBatch, Value};
use crate::tokenizer::tokenize;

/// Column kind for each of the 19 hot columns, in schema order.
enum HotKind {
    Str,
    Int,
    Float,
    Timestamp,
}

/// `(output index, source tag, kind, column name)` for the 19 hot columns —
/// spec.md §6's fixed-column table, indices 0..=18.
const HOT_COLUMNS: [(usize, u32, HotKind, &str); 19] = [
    (0, 35, HotKind::Str, "MsgType"),
    (1, 49, HotKind::Str, "SenderCompID"),
    (2, 56, HotKind::Str, "TargetCompID"),
    (3, 34, HotKind::Int, "MsgSeqNum"),
    (4, 52, HotKind::Timestamp, "SendingTime"),
    (5, 11, HotKind::Str, "ClOrdID"),
    (6, 37, HotKind::Str, "OrderID"),
    (7, 17, HotKind::Str, "ExecID"),
    (8, 55, HotKind::Str, "Symbol"),
    (9, 54, HotKind::Str, "Side"),
    (10, 150, HotKind::Str, "ExecType"),
    (11, 39, HotKind::Str, "OrdStatus"),
    (12, 44, HotKind::Float, "Price"),
    (13, 38, HotKind::Float, "OrderQty"),
    (14, 14, HotKind::Float, "CumQty"),
    (15, 151, HotKind::Float, "LeavesQty"),
    (16, 31, HotKind::Float, "LastPx"),
    (17, 32, HotKind::Float, "LastQty"),
    (18, 58, HotKind::Str, "Text"),
];

/// A cancellation signal the host checks before each row (spec.md §5). The
/// CLI wires this to `ctrlc`, the same `AtomicBool`-flag idiom the teacher
/// uses for its SIGINT handling.
pub type CancellationToken = Arc<AtomicBool>;

pub fn new_cancellation_token() -> CancellationToken {
    Arc::new(AtomicBool::new(false))
}

/// Iterator over row batches. Stops early (with whatever rows were already
/// assembled in the current batch) when the cancellation token is set.
pub struct ScanIter {
    bound: BoundScan,
    framer: LineFramer,
    cancel: CancellationToken,
    done: bool,
}

impl BoundScan {
    pub fn scan(self, cancel: CancellationToken) -> ScanIter {
        let framer = LineFramer::new(self.cursor.clone());
        ScanIter {
            bound: self,
            framer,
            cancel,
            done: false,
        }
    }
}

impl Iterator for ScanIter {
    type Item = Result<RowBatch, ScanIoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = RowBatch::with_capacity(self.bound.batch_size);

        while batch.len() < self.bound.batch_size {
            if self.cancel.load(Ordering::Relaxed) {
                self.done = true;
                break;
            }
            let line = match self.framer.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) => return Some(Err(e)),
            };
            if line.is_empty() {
                continue;
            }
            if let Some(row) = assemble_row(&self.bound, &line) {
                batch.rows.push(row);
            }
        }

        if batch.is_empty() && self.done {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

fn assemble_row(bound: &BoundScan, line: &[u8]) -> Option<Row> {
    let parsed = tokenize(line, bound.delimiter);
    let mut errors: Vec<String> = Vec::new();
    if let Some(structural) = parsed.structural_error {
        errors.push(structural.to_string());
    }

    let mut fixed = vec![Value::Null; 23];

    for (idx, tag, kind, name) in &HOT_COLUMNS {
        if !bound.projection.wants(*idx) {
            continue;
        }
        let Some(bytes) = parsed.hot(*tag) else {
            continue;
        };
        let value = match kind {
            HotKind::Str => std::str::from_utf8(bytes)
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| Value::Str(s.to_string())),
            HotKind::Int => match parse_int(bytes, name) {
                Ok(Some(v)) => Some(Value::Int(v)),
                Ok(None) => None,
                Err(msg) => {
                    errors.push(msg);
                    None
                }
            },
            HotKind::Float => match parse_float(bytes, name) {
                Ok(Some(v)) => Some(Value::Float(v)),
                Ok(None) => None,
                Err(msg) => {
                    errors.push(msg);
                    None
                }
            },
            HotKind::Timestamp => match parse_timestamp(bytes, name) {
                Ok(Some(v)) => Some(Value::Timestamp(v)),
                Ok(None) => None,
                Err(msg) => {
                    errors.push(msg);
                    None
                }
            },
        };
        if let Some(v) = value {
            fixed[*idx] = v;
        }
    }

    if bound.projection.wants_tags() && !parsed.overflow.is_empty() {
        let mut pairs: Vec<(u32, String)> = parsed
            .overflow
            .iter()
            .map(|(tag, span)| (*tag, String::from_utf8_lossy(parsed.slice(*span)).into_owned()))
            .collect();
        pairs.sort_by_key(|(tag, _)| *tag);
        fixed[19] = Value::TagMap(pairs);
    }

    if bound.projection.wants_groups() {
        if let Some(msg_type) = parsed.msg_type().and_then(|b| std::str::from_utf8(b).ok())
            && let Some(msg_def) = bound.dictionary.messages.get(msg_type)
            && let Some(groups) = parse_groups(&parsed, &msg_def.groups)
        {
            let mut out: Vec<(u32, Vec<Vec<(u32, String)>>)> = groups
                .into_iter()
                .map(|(count_tag, instances)| {
                    let rendered = instances
                        .into_iter()
                        .map(|instance| {
                            instance
                                .into_iter()
                                .map(|(tag, span)| {
                                    (tag, String::from_utf8_lossy(parsed.slice(span)).into_owned())
                                })
                                .collect()
                        })
                        .collect();
                    (count_tag, rendered)
                })
                .collect();
            out.sort_by_key(|(count_tag, _)| *count_tag);
            fixed[20] = Value::Groups(out);
        }
    }

    fixed[21] = Value::Bytes(line.to_vec());
    fixed[22] = if errors.is_empty() {
        Value::Null
    } else {
        Value::Str(errors.join("; "))
    };

    let custom = bound
        .custom_columns
        .iter()
        .map(|col| {
            parsed
                .any(col.tag)
                .filter(|b| !b.is_empty())
                .map(|b| Value::Str(String::from_utf8_lossy(b).into_owned()))
                .unwrap_or(Value::Null)
        })
        .collect();

    Some(Row { fixed, custom })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{bind, BindOptions};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    fn bound_for(file: &NamedTempFile) -> BoundScan {
        bind(BindOptions {
            paths: vec![file.path().to_string_lossy().into_owned()],
            ..Default::default()
        })
        .expect("bind should succeed")
    }

    #[test]
    fn scenario_1_basic_order() {
        let f = write_lines(&[
            "8=FIX.4.4|9=100|35=D|49=S|56=T|34=1|52=20231215-10:30:00|11=A|55=AAPL|54=1|38=100|44=150.50|10=000",
        ]);
        let bound = bound_for(&f);
        let mut scan = bound.scan(new_cancellation_token());
        let batch = scan.next().unwrap().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.fixed[0], Value::Str("D".to_string()));
        assert_eq!(row.fixed[1], Value::Str("S".to_string()));
        assert_eq!(row.fixed[3], Value::Int(1));
        assert_eq!(row.fixed[8], Value::Str("AAPL".to_string()));
        assert_eq!(row.fixed[13], Value::Float(100.0));
        assert_eq!(row.fixed[12], Value::Float(150.50));
        assert_eq!(row.fixed[22], Value::Null);
        match &row.fixed[19] {
            Value::TagMap(pairs) => {
                assert_eq!(
                    pairs,
                    &vec![
                        (8, "FIX.4.4".to_string()),
                        (9, "100".to_string()),
                        (10, "000".to_string())
                    ]
                );
            }
            other => panic!("expected TagMap, got {other:?}"),
        }
        assert_eq!(row.fixed[20], Value::Null);
    }

    #[test]
    fn scenario_2_missing_msg_type() {
        let f = write_lines(&["49=S|56=T|11=A"]);
        let bound = bound_for(&f);
        let mut scan = bound.scan(new_cancellation_token());
        let batch = scan.next().unwrap().unwrap();
        let row = &batch.rows[0];
        assert_eq!(
            row.fixed[22],
            Value::Str("Missing required tag 35 (MsgType)".to_string())
        );
        assert_eq!(row.fixed[21], Value::Bytes(b"49=S|56=T|11=A".to_vec()));
    }

    #[test]
    fn scenario_3_bad_numeric() {
        let f = write_lines(&["35=D|34=abc|52=20231215-10:30:00"]);
        let bound = bound_for(&f);
        let mut scan = bound.scan(new_cancellation_token());
        let batch = scan.next().unwrap().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.fixed[3], Value::Null);
        assert_eq!(
            row.fixed[22],
            Value::Str("Invalid MsgSeqNum: 'abc'".to_string())
        );
    }

    #[test]
    fn scenario_6_custom_tag_column() {
        let f = write_lines(&["35=D|60=20231215-10:30:00|55=AAPL"]);
        let bound = bind(BindOptions {
            paths: vec![f.path().to_string_lossy().into_owned()],
            rtags: vec!["TransactTime".to_string()],
            ..Default::default()
        })
        .unwrap();
        let mut scan = bound.scan(new_cancellation_token());
        let batch = scan.next().unwrap().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.custom[0], Value::Str("20231215-10:30:00".to_string()));
    }

    #[test]
    fn projection_skips_group_materialization() {
        let line = "35=8|55=AAPL|453=3|448=P1|447=D|452=1|448=P2|447=D|452=3|448=P3|447=D|452=11|10=000";
        let f = write_lines(&[line]);
        let bound = bind(BindOptions {
            paths: vec![f.path().to_string_lossy().into_owned()],
            projected_columns: Some(vec!["MsgType".to_string(), "Symbol".to_string()]),
            ..Default::default()
        })
        .unwrap();
        let mut scan = bound.scan(new_cancellation_token());
        let batch = scan.next().unwrap().unwrap();
        assert_eq!(batch.rows[0].fixed[20], Value::Null);
    }
}
