// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

use assert_cmd::Command;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn cmd() -> Command {
    Command::cargo_bin("fixtable").expect("fixtable binary should build")
}

fn temp_log(lines: &[&str]) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("temp file");
    for line in lines {
        writeln!(f, "{line}").expect("write line");
    }
    f
}

#[test]
fn decodes_single_message_from_file_path() {
    let f = temp_log(&["35=D|49=S|56=T|11=A|55=AAPL"]);
    cmd()
        .arg(f.path())
        .assert()
        .success()
        .stdout(contains("MsgType=D"))
        .stdout(contains("Symbol=AAPL"));
}

#[test]
fn reports_bind_error_for_empty_glob() {
    cmd()
        .arg("/no/such/path/*.does-not-exist")
        .assert()
        .failure()
        .stderr(contains("no files matched"));
}

#[test]
fn reports_bad_numeric_coercion_in_parse_error_column() {
    let f = temp_log(&["35=D|34=abc"]);
    cmd()
        .arg(f.path())
        .assert()
        .success()
        .stdout(contains("Invalid MsgSeqNum: 'abc'"));
}

#[test]
fn unknown_rtag_name_is_a_bind_error() {
    let f = temp_log(&["35=D"]);
    cmd()
        .arg(f.path())
        .arg("--rtag")
        .arg("NotAField")
        .assert()
        .failure()
        .stderr(contains("unknown field name"));
}

#[test]
fn json_output_mode_emits_valid_json_lines() {
    let f = temp_log(&["35=D|49=S"]);
    cmd()
        .arg(f.path())
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"MsgType\":\"D\""));
}

#[test]
fn fields_flag_lists_dictionary_fields() {
    let f = temp_log(&["35=D"]);
    cmd()
        .arg(f.path())
        .arg("--fields")
        .assert()
        .success()
        .stdout(contains("MsgType"));
}
