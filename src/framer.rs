// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Line framer (spec.md §4.5). Reads raw bytes (not `String` — FIX payloads
//! are not guaranteed valid UTF-8 outside the ASCII field grammar) through
//! buffered I/O, strips `\n` then one preceding `\r`; a lone `\r` is NOT
//! treated as a terminator (documented limitation, spec.md §9 — classic-Mac
//! logs will be mis-framed, and that is intentional, not a bug to fix here).
//!
//! `FileCursor` holds the shared, mutex-protected index into the bound file
//! list so that multiple workers (not implemented today, spec.md §5) could
//! later claim files without revisiting this contract.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex};

use crate::error::ScanIoError;

const READ_CHUNK: usize = 8 * 1024;

/// Shared, mutex-protected index into the bound file list (spec.md §4.5
/// "Ordering": `open-next` advances a shared index under a mutex).
#[derive(Clone)]
pub struct FileCursor {
    paths: Arc<Vec<String>>,
    next: Arc<Mutex<usize>>,
}

impl FileCursor {
    pub fn new(paths: Vec<String>) -> Self {
        FileCursor {
            paths: Arc::new(paths),
            next: Arc::new(Mutex::new(0)),
        }
    }

    /// Claim the next unclaimed path, or `None` once the list is exhausted.
    pub fn claim_next(&self) -> Option<String> {
        let mut guard = self.next.lock().expect("file cursor mutex poisoned");
        let idx = *guard;
        if idx >= self.paths.len() {
            return None;
        }
        *guard += 1;
        Some(self.paths[idx].clone())
    }
}

/// Per-worker framing state: an open reader, its 8 KiB buffer, and the
/// current line number within the open file.
pub struct LineFramer {
    cursor: FileCursor,
    reader: Option<BufReader<File>>,
    current_path: Option<String>,
    line_number: usize,
    scratch: Vec<u8>,
}

impl LineFramer {
    pub fn new(cursor: FileCursor) -> Self {
        LineFramer {
            cursor,
            reader: None,
            current_path: None,
            line_number: 0,
            scratch: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Current file path, if one is open.
    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn current_line_number(&self) -> usize {
        self.line_number
    }

    /// Open the next file under the shared cursor. Returns `Ok(true)` if one
    /// was claimed, `Ok(false)` once the file list is exhausted.
    fn open_next(&mut self) -> Result<bool, ScanIoError> {
        loop {
            let Some(path) = self.cursor.claim_next() else {
                return Ok(false);
            };
            match File::open(&path) {
                Ok(file) => {
                    self.reader = Some(BufReader::with_capacity(READ_CHUNK, file));
                    self.current_path = Some(path);
                    self.line_number = 0;
                    return Ok(true);
                }
                Err(source) => {
                    log::error!("cannot open {path}: {source}");
                    return Err(ScanIoError::Open { path, source });
                }
            }
        }
    }

    /// Read the next line across the whole bound file list, advancing to the
    /// next file on end-of-file. Returns `Ok(None)` once every file is
    /// exhausted. A final unterminated line at end-of-file IS emitted.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, ScanIoError> {
        loop {
            if self.reader.is_none() && !self.open_next()? {
                return Ok(None);
            }
            let reader = self.reader.as_mut().expect("reader just opened");
            self.scratch.clear();
            let n = reader.read_until(b'\n', &mut self.scratch).map_err(|source| {
                ScanIoError::Read {
                    path: self.current_path.clone().unwrap_or_default(),
                    source,
                }
            })?;
            if n == 0 {
                self.reader = None;
                self.current_path = None;
                continue;
            }
            self.line_number += 1;
            trim_line_ending(&mut self.scratch);
            return Ok(Some(self.scratch.clone()));
        }
    }
}

fn trim_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().expect("temp file");
        f.write_all(contents).expect("write");
        f
    }

    #[test]
    fn reads_lf_and_crlf_and_unterminated_final_line() {
        let f = write_temp(b"one\r\ntwo\nthree");
        let cursor = FileCursor::new(vec![f.path().to_string_lossy().into_owned()]);
        let mut framer = LineFramer::new(cursor);
        assert_eq!(framer.read_line().unwrap(), Some(b"one".to_vec()));
        assert_eq!(framer.read_line().unwrap(), Some(b"two".to_vec()));
        assert_eq!(framer.read_line().unwrap(), Some(b"three".to_vec()));
        assert_eq!(framer.read_line().unwrap(), None);
    }

    #[test]
    fn lone_cr_is_not_a_terminator() {
        let f = write_temp(b"a\rb\n");
        let cursor = FileCursor::new(vec![f.path().to_string_lossy().into_owned()]);
        let mut framer = LineFramer::new(cursor);
        assert_eq!(framer.read_line().unwrap(), Some(b"a\rb".to_vec()));
    }

    #[test]
    fn advances_across_multiple_files_in_order() {
        let a = write_temp(b"a1\na2\n");
        let b = write_temp(b"b1\n");
        let cursor = FileCursor::new(vec![
            a.path().to_string_lossy().into_owned(),
            b.path().to_string_lossy().into_owned(),
        ]);
        let mut framer = LineFramer::new(cursor);
        assert_eq!(framer.read_line().unwrap(), Some(b"a1".to_vec()));
        assert_eq!(framer.read_line().unwrap(), Some(b"a2".to_vec()));
        assert_eq!(framer.read_line().unwrap(), Some(b"b1".to_vec()));
        assert_eq!(framer.read_line().unwrap(), None);
    }
}
