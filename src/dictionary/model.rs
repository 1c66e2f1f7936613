// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! The expanded, post-component-expansion dictionary (spec.md §3). Built from
//! [`crate::dictionary::xml::RawDictionary`] by flattening component
//! references into the message/group that references them — after this step
//! components no longer appear anywhere in the model.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::dictionary::xml::{self, RawDictionary};
use crate::error::BindError;

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub symbol: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub tag: u32,
    pub name: String,
    pub type_tag: String,
    pub enum_list: Vec<EnumValue>,
}

#[derive(Debug, Clone)]
pub struct GroupDef {
    pub count_tag: u32,
    pub member_tags: Vec<u32>,
    pub subgroups: HashMap<u32, GroupDef>,
}

#[derive(Debug, Clone)]
pub struct MessageDef {
    pub name: String,
    pub msg_type: String,
    pub required_tags: Vec<u32>,
    pub optional_tags: Vec<u32>,
    pub groups: HashMap<u32, GroupDef>,
}

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    pub fields: HashMap<u32, FieldDef>,
    pub messages: HashMap<String, MessageDef>,
    pub name_to_tag: HashMap<String, u32>,
}

impl Dictionary {
    pub fn from_xml(xml: &str) -> Result<Self, BindError> {
        let raw = RawDictionary::from_xml(xml)?;
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &RawDictionary) -> Result<Self, BindError> {
        // Field map construction fans out over rayon the way schema.rs's
        // SchemaTree::build does for its own field map — dictionaries can
        // carry thousands of <field> entries and this is pure per-item work.
        let built_fields: Vec<(u32, FieldDef)> = raw
            .fields
            .items
            .par_iter()
            .map(|f| {
                (
                    f.number,
                    FieldDef {
                        tag: f.number,
                        name: f.name.clone(),
                        type_tag: f.field_type.clone(),
                        enum_list: f
                            .values
                            .iter()
                            .map(|v| EnumValue {
                                symbol: v.enumeration.clone(),
                                description: v.description.clone(),
                            })
                            .collect(),
                    },
                )
            })
            .collect();

        let mut fields = HashMap::new();
        let mut name_to_tag = HashMap::new();
        for (tag, field) in built_fields {
            name_to_tag.insert(field.name.clone(), tag);
            fields.insert(tag, field);
        }

        let component_defs: HashMap<String, &xml::ComponentDef> = raw
            .components
            .items
            .iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        let mut expander = Expander {
            fields: &fields,
            defs: &component_defs,
        };

        let mut messages = HashMap::new();
        for msg in &raw.messages.items {
            let mut required = Vec::new();
            let mut optional = Vec::new();
            let mut groups = HashMap::new();
            let mut stack = Vec::new();

            for fref in &msg.fields {
                expander.push_field_ref(fref, &mut required, &mut optional)?;
            }
            for cref in &msg.components {
                expander.expand_component_ref(cref, &mut required, &mut optional, &mut groups, &mut stack)?;
            }
            for gdef in &msg.groups {
                let group = expander.build_group(gdef)?;
                groups.insert(group.count_tag, group);
            }

            messages.insert(
                msg.msg_type.clone(),
                MessageDef {
                    name: msg.name.clone(),
                    msg_type: msg.msg_type.clone(),
                    required_tags: required,
                    optional_tags: optional,
                    groups,
                },
            );
        }

        Ok(Dictionary {
            fields,
            messages,
            name_to_tag,
        })
    }

    /// Re-parse `xml` and overwrite colliding field/message-type entries
    /// (spec.md §4.1 overlay, P6 right-biased). Components are not part of
    /// the overlay surface — they are loader-internal staging only.
    pub fn apply_overlay(&mut self, xml: &str) -> Result<(), BindError> {
        let overlay = Self::from_xml(xml)?;
        for (tag, field) in overlay.fields {
            if self.fields.contains_key(&tag) {
                log::debug!("overlay replaces field tag {tag}");
            }
            self.name_to_tag.insert(field.name.clone(), tag);
            self.fields.insert(tag, field);
        }
        for (msg_type, def) in overlay.messages {
            if self.messages.contains_key(&msg_type) {
                log::debug!("overlay replaces message type {msg_type}");
            }
            self.messages.insert(msg_type, def);
        }
        Ok(())
    }
}

struct Expander<'a> {
    fields: &'a HashMap<u32, FieldDef>,
    defs: &'a HashMap<String, &'a xml::ComponentDef>,
}

impl<'a> Expander<'a> {
    fn push_field_ref(
        &self,
        fref: &xml::FieldRef,
        required: &mut Vec<u32>,
        optional: &mut Vec<u32>,
    ) -> Result<(), BindError> {
        let tag = self.resolve_tag(&fref.name)?;
        if fref.required.as_deref() == Some("Y") {
            required.push(tag);
        } else {
            optional.push(tag);
        }
        Ok(())
    }

    fn resolve_tag(&self, name: &str) -> Result<u32, BindError> {
        self.fields
            .values()
            .find(|f| f.name == name)
            .map(|f| f.tag)
            .ok_or_else(|| {
                BindError::DictionaryBuild(format!(
                    "field '{name}' referenced in dictionary but not defined in <fields>"
                ))
            })
    }

    fn expand_component_ref(
        &mut self,
        cref: &xml::ComponentRef,
        required: &mut Vec<u32>,
        optional: &mut Vec<u32>,
        groups: &mut HashMap<u32, GroupDef>,
        stack: &mut Vec<String>,
    ) -> Result<(), BindError> {
        if stack.contains(&cref.name) {
            log::warn!("recursive component detected at {}, skipping", cref.name);
            return Ok(());
        }
        let Some(def) = self.defs.get(&cref.name).copied() else {
            return Err(BindError::DictionaryBuild(format!(
                "component '{}' referenced but not defined in <components>",
                cref.name
            )));
        };
        stack.push(cref.name.clone());

        for fref in &def.fields {
            // Component expansion drops the ref-level required/optional
            // override for fields whose own ref says required, but a field's
            // placement follows the enclosing field ref's flag, not the
            // component's own `required` attribute — observed teacher
            // behavior (schema.rs `FieldRef.required`), preserved as-is.
            self.push_field_ref(fref, required, optional)?;
        }
        for nested_cref in &def.components {
            self.expand_component_ref(nested_cref, required, optional, groups, stack)?;
        }
        for gdef in &def.groups {
            let group = self.build_group(gdef)?;
            groups.insert(group.count_tag, group);
        }

        stack.pop();
        Ok(())
    }

    fn build_group(&self, gdef: &xml::GroupDef) -> Result<GroupDef, BindError> {
        let count_tag = self.resolve_tag(&gdef.name)?;
        let mut member_tags = Vec::new();
        for fref in &gdef.fields {
            member_tags.push(self.resolve_tag(&fref.name)?);
        }
        let mut subgroups = HashMap::new();
        for nested in &gdef.groups {
            let sub = self.build_group(nested)?;
            subgroups.insert(sub.count_tag, sub);
        }
        // Components referenced directly inside a group contribute member
        // fields in declaration order, same as in a message.
        for cref in &gdef.components {
            let Some(def) = self.defs.get(&cref.name).copied() else {
                return Err(BindError::DictionaryBuild(format!(
                    "component '{}' referenced in group '{}' but not defined",
                    cref.name, gdef.name
                )));
            };
            for fref in &def.fields {
                member_tags.push(self.resolve_tag(&fref.name)?);
            }
        }
        Ok(GroupDef {
            count_tag,
            member_tags,
            subgroups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<fix major="4" minor="4">
  <fields>
    <field number="35" name="MsgType" type="STRING"/>
    <field number="49" name="SenderCompID" type="STRING"/>
    <field number="453" name="NoPartyIDs" type="NUMINGROUP"/>
    <field number="448" name="PartyID" type="STRING"/>
    <field number="447" name="PartyIDSource" type="CHAR"/>
    <field number="452" name="PartyRole" type="INT"/>
  </fields>
  <components>
    <component name="Parties">
      <group name="NoPartyIDs">
        <field name="PartyID"/>
        <field name="PartyIDSource"/>
        <field name="PartyRole"/>
      </group>
    </component>
  </components>
  <messages>
    <message name="NewOrderSingle" msgtype="D">
      <field name="MsgType" required="Y"/>
      <field name="SenderCompID" required="Y"/>
      <component name="Parties" required="N"/>
    </message>
  </messages>
</fix>"#;

    #[test]
    fn expands_component_group_into_message() {
        let dict = Dictionary::from_xml(MINIMAL).expect("dictionary should load");
        let msg = dict.messages.get("D").expect("NewOrderSingle present");
        let group = msg.groups.get(&453).expect("group 453 expanded from component");
        assert_eq!(group.member_tags, vec![448, 447, 452]);
        assert_eq!(msg.required_tags, vec![35, 49]);
    }

    #[test]
    fn overlay_is_right_biased() {
        let mut dict = Dictionary::from_xml(MINIMAL).expect("base dictionary");
        let overlay = r#"<fix major="4" minor="4">
  <fields>
    <field number="35" name="MsgType" type="CHAR"/>
  </fields>
  <messages/>
  <components/>
</fix>"#;
        dict.apply_overlay(overlay).expect("overlay applies");
        assert_eq!(dict.fields.get(&35).unwrap().type_tag, "CHAR");
    }

    #[test]
    fn unresolved_group_member_is_a_bind_error() {
        let xml = r#"<fix major="4" minor="4">
  <fields>
    <field number="1" name="Account" type="STRING"/>
    <field number="2" name="NoSides" type="NUMINGROUP"/>
  </fields>
  <components/>
  <messages>
    <message name="Test" msgtype="T">
      <group name="NoSides">
        <field name="DoesNotExist"/>
      </group>
    </message>
  </messages>
</fix>"#;
        let err = Dictionary::from_xml(xml).expect_err("unknown member name must fail to load");
        assert!(matches!(err, BindError::DictionaryBuild(_)));
    }
}
