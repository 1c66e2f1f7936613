// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! CLI front end for `fixtable`: binds a scan from command-line options and
//! streams rows to stdout, either as an aligned table or as
//! newline-delimited JSON.

use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use fixtable::bind::{bind, BindOptions};
use fixtable::row::{Value, FIXED_COLUMNS};
use fixtable::scan::new_cancellation_token;
use terminal_size::{terminal_size, Width};

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (rustc ",
        env!("RUSTC_VERSION"),
        ", commit ",
        env!("FIXTABLE_COMMIT"),
        ")"
    )
}

#[derive(Parser, Debug)]
#[command(name = "fixtable", version, long_version = long_version(), about = "Table-valued FIX log reader")]
struct Cli {
    /// One or more glob patterns for input log files.
    #[arg(required = true)]
    paths: Vec<String>,

    /// Path to a QuickFIX-style XML dictionary. Defaults to the embedded FIX-4.4.
    #[arg(long)]
    dictionary: Option<String>,

    /// Overlay XML merged on top of the base dictionary (fields/messages only).
    #[arg(long)]
    overlay: Option<String>,

    /// Delimiter: a literal character, "SOH", "\x01", or a hex byte like "0x01".
    #[arg(long, default_value = "|")]
    delimiter: String,

    /// Custom column by field name (repeatable); unknown names are a bind error.
    #[arg(long = "rtag", value_name = "NAME")]
    rtags: Vec<String>,

    /// Custom column by tag number (repeatable); unknown tags are named Tag<N>.
    #[arg(long = "tag-id", value_name = "N")]
    tag_ids: Vec<u32>,

    /// Output as newline-delimited JSON instead of an aligned table.
    #[arg(long)]
    json: bool,

    /// Print the dictionary's field catalog and exit.
    #[arg(long)]
    fields: bool,

    /// Print the dictionary's group catalog and exit.
    #[arg(long)]
    groups: bool,

    /// Print per-field usage for the given message type and exit.
    #[arg(long = "message-fields", value_name = "MSGTYPE")]
    message_fields: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let opts = BindOptions {
        paths: cli.paths.clone(),
        dictionary_path: cli.dictionary.clone(),
        overlay_path: cli.overlay.clone(),
        delimiter: Some(cli.delimiter.clone()),
        rtags: cli.rtags.clone(),
        tag_ids: cli.tag_ids.clone(),
        projected_columns: None,
        batch_size: None,
    };

    let bound = bind(opts).context("failed to bind scan")?;

    if cli.fields || cli.groups || cli.message_fields.is_some() {
        return print_introspection(&cli, &bound.dictionary);
    }

    let cancel = new_cancellation_token();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("failed to install SIGINT handler")?;
    }

    let custom_names: Vec<String> = bound.custom_columns.iter().map(|c| c.name.clone()).collect();
    let headers: Vec<String> = FIXED_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(custom_names)
        .collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for batch in bound.scan(cancel) {
        let batch = batch.context("scan failed")?;
        for row in &batch.rows {
            if cli.json {
                print_json_row(&mut out, &headers, row)?;
            } else {
                print_table_row(&mut out, &headers, row)?;
            }
        }
    }

    Ok(())
}

fn print_introspection(cli: &Cli, dictionary: &fixtable::dictionary::model::Dictionary) -> anyhow::Result<()> {
    use fixtable::introspect::{fields_table, groups_table, message_fields_table};

    if cli.fields {
        for row in fields_table(dictionary) {
            println!("{}\t{}\t{}", row.tag, row.name, row.type_tag);
        }
    }
    if cli.groups {
        for row in groups_table(dictionary) {
            println!("{}\t{}", row.count_tag, row.msg_types.join(","));
        }
    }
    if let Some(msg_type) = &cli.message_fields {
        for row in message_fields_table(dictionary, msg_type) {
            println!(
                "{}\t{}\t{}",
                row.tag,
                if row.required { "required" } else { "optional" },
                row.group_id.map(|g| g.to_string()).unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Timestamp(t) => t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        Value::TagMap(pairs) => pairs
            .iter()
            .map(|(tag, v)| format!("{tag}={v}"))
            .collect::<Vec<_>>()
            .join(","),
        Value::Groups(groups) => groups
            .iter()
            .map(|(count_tag, instances)| {
                let rendered = instances
                    .iter()
                    .map(|instance| {
                        instance
                            .iter()
                            .map(|(tag, v)| format!("{tag}={v}"))
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect::<Vec<_>>()
                    .join(";");
                format!("{count_tag}:[{rendered}]")
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Terminal column width, but only when stdout is actually a terminal.
/// `terminal_size()` returns `None` when piped (as under `assert_cmd`, or any
/// redirect into a file/pipeline) — data rows must not be truncated in that
/// case, since the row output is the machine-readable product, not a human
/// catalog listing.
fn terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Emits the full tab-joined row line. Only truncated (with a trailing
/// marker) when stdout is a real terminal narrower than the line — never
/// when piped, since truncating data rows would make the output lossy.
fn print_table_row(out: &mut impl std::io::Write, headers: &[String], row: &fixtable::row::Row) -> anyhow::Result<()> {
    let values: Vec<String> = row
        .fixed
        .iter()
        .chain(row.custom.iter())
        .map(value_to_string)
        .collect();
    let cols: Vec<String> = headers
        .iter()
        .zip(values.iter())
        .map(|(h, v)| format!("{h}={v}"))
        .collect();
    let line = cols.join("\t");
    match terminal_width() {
        Some(width) if width > 1 && line.chars().count() > width => {
            let truncated: String = line.chars().take(width - 1).collect();
            writeln!(out, "{truncated}\u{2026}")?;
        }
        _ => writeln!(out, "{line}")?,
    }
    Ok(())
}

fn print_json_row(out: &mut impl std::io::Write, headers: &[String], row: &fixtable::row::Row) -> anyhow::Result<()> {
    let mut map = serde_json::Map::new();
    for (header, value) in headers.iter().zip(row.fixed.iter().chain(row.custom.iter())) {
        let json_value = match value {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            other => serde_json::Value::String(value_to_string(other)),
        };
        map.insert(header.clone(), json_value);
    }
    writeln!(out, "{}", serde_json::Value::Object(map))?;
    Ok(())
}
