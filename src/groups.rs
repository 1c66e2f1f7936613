// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Dictionary-driven repeating-group reconstruction (spec.md §4.3). Purely
//! positional: the count tag announces N instances, the first member tag
//! (the delimiter tag) marks each new instance boundary, and reconstruction
//! is bounded by `min(declared count, 100)` (the sanity ceiling, P3).
//!
//! Nested subgroups are deliberately NOT expanded inside instances — this
//! mirrors spec.md §4.3's documented policy for this revision, which departs
//! from how group rendering elsewhere in this lineage recurses into nested
//! specs for display. Don't "fix" this to recurse; it's intentional here.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::dictionary::model::GroupDef;
use crate::tokenizer::{ParsedMessage, Span};

const SANITY_CEILING: i64 = 100;

/// One group instance: member tag → value span, insertion-ordered.
pub type GroupInstance = IndexMap<u32, Span>;

/// `count-tag -> instances`, the shape spec.md §3 calls for.
pub type GroupsValue = HashMap<u32, Vec<GroupInstance>>;

/// Reconstruct every repeating group declared for `groups` against the
/// ordered tag sequence in `msg`. Returns `None` when no group produced a
/// non-empty instance (spec.md §4.3 step 4).
pub fn parse_groups(msg: &ParsedMessage, groups: &HashMap<u32, GroupDef>) -> Option<GroupsValue> {
    let mut out = GroupsValue::new();
    for (count_tag, def) in groups {
        if let Some(instances) = parse_one_group(msg, def) {
            out.insert(*count_tag, instances);
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

fn parse_one_group(msg: &ParsedMessage, def: &GroupDef) -> Option<Vec<GroupInstance>> {
    let count_bytes = msg.overflow_value(def.count_tag)?;
    let declared: i64 = std::str::from_utf8(count_bytes).ok()?.parse().ok()?;
    if declared <= 0 || declared > SANITY_CEILING {
        return None;
    }
    let declared = declared as usize;

    let start = msg.ordered.iter().position(|(tag, _)| *tag == def.count_tag)?;
    let delimiter_tag = *def.member_tags.first()?;
    let member_set: std::collections::HashSet<u32> = def.member_tags.iter().copied().collect();

    let mut instances = Vec::new();
    let mut idx = start + 1;
    while instances.len() < declared && idx < msg.ordered.len() {
        let (tag, _) = msg.ordered[idx];
        if tag != delimiter_tag {
            // Anything other than the delimiter tag here means there is no
            // more data for this group; stop rather than skip ahead (purely
            // positional, no content validation per spec.md §4.3).
            break;
        }
        let (instance, consumed) = collect_instance(&msg.ordered[idx..], delimiter_tag, &member_set);
        if !instance.is_empty() {
            instances.push(instance);
        }
        idx += consumed.max(1);
    }

    if instances.is_empty() { None } else { Some(instances) }
}

/// Collect one instance starting at `tags[0]` (the delimiter tag). Ends when
/// the next tag is not in the member set, or is the delimiter tag again.
fn collect_instance(
    tags: &[(u32, Span)],
    delimiter_tag: u32,
    member_set: &std::collections::HashSet<u32>,
) -> (GroupInstance, usize) {
    let mut instance = GroupInstance::new();
    let mut idx = 0;
    while idx < tags.len() {
        let (tag, span) = tags[idx];
        if idx > 0 && tag == delimiter_tag {
            break;
        }
        if !member_set.contains(&tag) {
            break;
        }
        instance.insert(tag, span);
        idx += 1;
    }
    (instance, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use std::collections::HashMap;

    fn noparty_group() -> GroupDef {
        GroupDef {
            count_tag: 453,
            member_tags: vec![448, 447, 452],
            subgroups: HashMap::new(),
        }
    }

    #[test]
    fn scenario_4_repeating_group() {
        let line = b"35=8|55=AAPL|453=3|448=P1|447=D|452=1|448=P2|447=D|452=3|448=P3|447=D|452=11|10=000";
        let parsed = tokenize(line, b'|');
        let mut groups = HashMap::new();
        groups.insert(453, noparty_group());
        let result = parse_groups(&parsed, &groups).expect("group 453 present");
        let instances = &result[&453];
        assert_eq!(instances.len(), 3);
        assert_eq!(parsed.slice(instances[0][&448]), b"P1");
        assert_eq!(parsed.slice(instances[2][&452]), b"11");
    }

    #[test]
    fn declared_count_zero_means_absent() {
        let parsed = tokenize(b"35=8|453=0", b'|');
        let mut groups = HashMap::new();
        groups.insert(453, noparty_group());
        assert!(parse_groups(&parsed, &groups).is_none());
    }

    #[test]
    fn declared_count_over_ceiling_means_absent() {
        let parsed = tokenize(b"35=8|453=101|448=P1|447=D|452=1", b'|');
        let mut groups = HashMap::new();
        groups.insert(453, noparty_group());
        assert!(parse_groups(&parsed, &groups).is_none());
    }

    #[test]
    fn short_data_truncates_silently() {
        let line = b"35=8|453=5|448=P1|447=D|452=1|448=P2|447=D|452=3";
        let parsed = tokenize(line, b'|');
        let mut groups = HashMap::new();
        groups.insert(453, noparty_group());
        let result = parse_groups(&parsed, &groups).unwrap();
        assert_eq!(result[&453].len(), 2);
    }
}
