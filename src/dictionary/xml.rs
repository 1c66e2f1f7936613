// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Raw QuickFIX-style XML shape. Parsed primarily with `roxmltree`; the same
//! structs also derive `serde::Deserialize` so small fixtures can be checked
//! with `quick_xml::de::from_str` in unit tests, mirroring the two parsing
//! paths the dictionary format has historically been read with in this
//! codebase.

use roxmltree::{Document, Node};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("missing <{0}> section")]
    MissingSection(&'static str),

    #[error("missing attribute @{attr} on <{tag}>")]
    MissingAttribute { tag: String, attr: String },

    #[error("invalid field number on field '{0}'")]
    InvalidFieldNumber(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "fix")]
pub struct RawDictionary {
    #[serde(rename = "@major", default)]
    pub major: String,
    #[serde(rename = "@minor", default)]
    pub minor: String,
    #[serde(rename = "fields", default)]
    pub fields: FieldContainer,
    #[serde(rename = "messages", default)]
    pub messages: MessageContainer,
    #[serde(rename = "components", default)]
    pub components: ComponentContainer,
}

impl RawDictionary {
    pub fn from_xml(xml: &str) -> Result<Self, XmlError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();

        let fields_node =
            find_child(root, "fields").ok_or(XmlError::MissingSection("fields"))?;
        let messages_node =
            find_child(root, "messages").ok_or(XmlError::MissingSection("messages"))?;
        let components_node = find_child(root, "components");

        Ok(RawDictionary {
            major: root.attribute("major").unwrap_or_default().to_string(),
            minor: root.attribute("minor").unwrap_or_default().to_string(),
            fields: FieldContainer {
                items: parse_fields(fields_node)?,
            },
            messages: MessageContainer {
                items: parse_messages(messages_node)?,
            },
            components: ComponentContainer {
                items: components_node
                    .map(parse_components)
                    .transpose()?
                    .unwrap_or_default(),
            },
        })
    }
}

fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.has_tag_name(tag))
}

fn children_with_tag<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(tag))
}

fn attr(node: Node, name: &str) -> Result<String, XmlError> {
    node.attribute(name)
        .map(|s| s.to_string())
        .ok_or_else(|| XmlError::MissingAttribute {
            tag: node.tag_name().name().to_string(),
            attr: name.to_string(),
        })
}

fn parse_fields(node: Node) -> Result<Vec<Field>, XmlError> {
    children_with_tag(node, "field").map(parse_field).collect()
}

fn parse_field(node: Node) -> Result<Field, XmlError> {
    let number_str = attr(node, "number")?;
    let number = number_str
        .parse()
        .map_err(|_| XmlError::InvalidFieldNumber(number_str.clone()))?;
    let mut values = Vec::new();
    for value_node in children_with_tag(node, "value") {
        values.push(Value {
            enumeration: attr(value_node, "enum")?,
            description: value_node.attribute("description").unwrap_or("").to_string(),
        });
    }
    Ok(Field {
        name: attr(node, "name")?,
        number,
        field_type: attr(node, "type")?,
        values,
    })
}

fn parse_messages(node: Node) -> Result<Vec<Message>, XmlError> {
    children_with_tag(node, "message")
        .map(parse_message)
        .collect()
}

fn parse_message(node: Node) -> Result<Message, XmlError> {
    Ok(Message {
        name: attr(node, "name")?,
        msg_type: attr(node, "msgtype")?,
        fields: parse_field_refs(node)?,
        groups: parse_groups(node)?,
        components: parse_component_refs(node)?,
    })
}

fn parse_components(node: Node) -> Result<Vec<ComponentDef>, XmlError> {
    children_with_tag(node, "component")
        .map(parse_component_def)
        .collect()
}

fn parse_component_def(node: Node) -> Result<ComponentDef, XmlError> {
    Ok(ComponentDef {
        name: attr(node, "name")?,
        fields: parse_field_refs(node)?,
        groups: parse_groups(node)?,
        components: parse_component_refs(node)?,
    })
}

fn parse_groups(node: Node) -> Result<Vec<GroupDef>, XmlError> {
    children_with_tag(node, "group").map(parse_group).collect()
}

fn parse_group(node: Node) -> Result<GroupDef, XmlError> {
    Ok(GroupDef {
        name: attr(node, "name")?,
        required: node.attribute("required").map(|s| s.to_string()),
        fields: parse_field_refs(node)?,
        groups: parse_groups(node)?,
        components: parse_component_refs(node)?,
    })
}

fn parse_field_refs(node: Node) -> Result<Vec<FieldRef>, XmlError> {
    children_with_tag(node, "field")
        .map(|child| {
            Ok(FieldRef {
                name: attr(child, "name")?,
                required: child.attribute("required").map(|s| s.to_string()),
            })
        })
        .collect()
}

fn parse_component_refs(node: Node) -> Result<Vec<ComponentRef>, XmlError> {
    children_with_tag(node, "component")
        .map(|child| {
            Ok(ComponentRef {
                name: attr(child, "name")?,
                required: child.attribute("required").map(|s| s.to_string()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FieldContainer {
    #[serde(rename = "field", default)]
    pub items: Vec<Field>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MessageContainer {
    #[serde(rename = "message", default)]
    pub items: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ComponentContainer {
    #[serde(rename = "component", default)]
    pub items: Vec<ComponentDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@number")]
    pub number: u32,
    #[serde(rename = "@type")]
    pub field_type: String,
    #[serde(rename = "value", default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Value {
    #[serde(rename = "@enum")]
    pub enumeration: String,
    #[serde(rename = "@description", default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldRef {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@required", default)]
    pub required: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupDef {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@required", default)]
    pub required: Option<String>,
    #[serde(rename = "field", default)]
    pub fields: Vec<FieldRef>,
    #[serde(rename = "group", default)]
    pub groups: Vec<GroupDef>,
    #[serde(rename = "component", default)]
    pub components: Vec<ComponentRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentRef {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@required", default)]
    pub required: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ComponentDef {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "field", default)]
    pub fields: Vec<FieldRef>,
    #[serde(rename = "group", default)]
    pub groups: Vec<GroupDef>,
    #[serde(rename = "component", default)]
    pub components: Vec<ComponentRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@msgtype")]
    pub msg_type: String,
    #[serde(rename = "field", default)]
    pub fields: Vec<FieldRef>,
    #[serde(rename = "group", default)]
    pub groups: Vec<GroupDef>,
    #[serde(rename = "component", default)]
    pub components: Vec<ComponentRef>,
}
