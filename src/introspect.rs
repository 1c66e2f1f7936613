// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Dictionary introspection (spec.md §6 secondary surface) — thin, sorted
//! projections over [`crate::dictionary::model::Dictionary`]. These re-use
//! the dictionary model built for the main scan; they do not re-parse or
//! re-expand anything.

use crate::dictionary::model::Dictionary;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    pub tag: u32,
    pub name: String,
    pub type_tag: String,
}

/// All defined fields, sorted by tag (spec.md §6 "rows are sorted by tag").
pub fn fields_table(dict: &Dictionary) -> Vec<FieldRow> {
    let mut rows: Vec<FieldRow> = dict
        .fields
        .values()
        .map(|f| FieldRow {
            tag: f.tag,
            name: f.name.clone(),
            type_tag: f.type_tag.clone(),
        })
        .collect();
    rows.sort_by_key(|r| r.tag);
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageFieldRow {
    pub msg_type: String,
    pub tag: u32,
    pub required: bool,
    /// The count-tag of the enclosing group, if this field is a group member
    /// rather than a top-level message field.
    pub group_id: Option<u32>,
}

/// Per-message field usage: top-level required/optional fields plus every
/// group member tag, tagged with its enclosing group's count tag.
pub fn message_fields_table(dict: &Dictionary, msg_type: &str) -> Vec<MessageFieldRow> {
    let mut rows = Vec::new();
    let Some(msg) = dict.messages.get(msg_type) else {
        return rows;
    };
    for &tag in &msg.required_tags {
        rows.push(MessageFieldRow {
            msg_type: msg_type.to_string(),
            tag,
            required: true,
            group_id: None,
        });
    }
    for &tag in &msg.optional_tags {
        rows.push(MessageFieldRow {
            msg_type: msg_type.to_string(),
            tag,
            required: false,
            group_id: None,
        });
    }
    for group in msg.groups.values() {
        push_group_members(msg_type, group, &mut rows);
    }
    rows.sort_by_key(|r| r.tag);
    rows
}

fn push_group_members(
    msg_type: &str,
    group: &crate::dictionary::model::GroupDef,
    rows: &mut Vec<MessageFieldRow>,
) {
    for &tag in &group.member_tags {
        rows.push(MessageFieldRow {
            msg_type: msg_type.to_string(),
            tag,
            required: false,
            group_id: Some(group.count_tag),
        });
    }
    for sub in group.subgroups.values() {
        push_group_members(msg_type, sub, rows);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub count_tag: u32,
    /// Message types that declare this group, deduplicated and sorted.
    pub msg_types: Vec<String>,
}

/// The catalog of groups (by count tag) with the message types that
/// reference each, sorted by count tag; message-type lists deduplicated and
/// sorted (spec.md §6).
pub fn groups_table(dict: &Dictionary) -> Vec<GroupRow> {
    let mut by_tag: std::collections::HashMap<u32, Vec<String>> = std::collections::HashMap::new();
    for msg in dict.messages.values() {
        collect_group_tags(&msg.groups, msg, &mut by_tag);
    }
    let mut rows: Vec<GroupRow> = by_tag
        .into_iter()
        .map(|(count_tag, mut msg_types)| {
            msg_types.sort();
            msg_types.dedup();
            GroupRow { count_tag, msg_types }
        })
        .collect();
    rows.sort_by_key(|r| r.count_tag);
    rows
}

fn collect_group_tags(
    groups: &std::collections::HashMap<u32, crate::dictionary::model::GroupDef>,
    msg: &crate::dictionary::model::MessageDef,
    by_tag: &mut std::collections::HashMap<u32, Vec<String>>,
) {
    for group in groups.values() {
        by_tag
            .entry(group.count_tag)
            .or_default()
            .push(msg.msg_type.clone());
        collect_group_tags(&group.subgroups, msg, by_tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::embedded::embedded_fix44;

    #[test]
    fn fields_table_is_sorted_by_tag() {
        let dict = Dictionary::from_xml(embedded_fix44()).unwrap();
        let rows = fields_table(&dict);
        let tags: Vec<u32> = rows.iter().map(|r| r.tag).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
    }

    #[test]
    fn message_fields_table_marks_group_members() {
        let dict = Dictionary::from_xml(embedded_fix44()).unwrap();
        let rows = message_fields_table(&dict, "8");
        let group_row = rows.iter().find(|r| r.tag == 437).expect("ContraTradeQty present");
        assert_eq!(group_row.group_id, Some(382));
    }

    #[test]
    fn groups_table_dedupes_and_sorts_msg_types() {
        let dict = Dictionary::from_xml(embedded_fix44()).unwrap();
        let rows = groups_table(&dict);
        let noparty = rows.iter().find(|r| r.count_tag == 453).expect("NoPartyIDs group present");
        assert!(noparty.msg_types.contains(&"D".to_string()));
        assert!(noparty.msg_types.contains(&"8".to_string()));
        let mut sorted = noparty.msg_types.clone();
        sorted.sort();
        assert_eq!(noparty.msg_types, sorted);
    }
}
