//! RML: вложенный формат разметки внутри значения поля.
//!
//! Значение поля типа `Rml` хранит небольшое дерево элементов с атрибутами
//! и общей таблицей строк. В тексте оно разворачивается в обычные элементы
//! разметки.

mod codec;

pub use codec::{read_rml, write_rml, RML_MIN_LEN};

use binobj_error::{BinobjResult, FieldError, TextError};

use crate::{fields::FieldType, hashing::parse_hash, text::TextNode};

/// Обёртка вокруг корня RML в тексте.
pub const RML_TAG: &str = "rml";
/// Атрибут обёртки с байтом флагов, если он не нулевой.
pub const FLAGS_ATTR: &str = "flags";

/// Атрибут элемента.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RmlAttribute {
    pub name: String,
    pub value: String,
}

/// Элемент RML.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RmlNode {
    pub name: String,
    pub value: String,
    pub attributes: Vec<RmlAttribute>,
    pub children: Vec<RmlNode>,
}

/// Документ RML: байт флагов из заголовка и корневой элемент.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RmlDocument {
    pub flags: u8,
    pub root: RmlNode,
}

impl RmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Кол-во элементов в поддереве, включая этот.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RmlNode::node_count).sum::<usize>()
    }

    /// Кол-во атрибутов во всём поддереве.
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
            + self
                .children
                .iter()
                .map(RmlNode::attribute_count)
                .sum::<usize>()
    }

    pub fn to_text_node(&self) -> TextNode {
        TextNode {
            tag: self.name.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect(),
            text: self.value.clone(),
            children: self.children.iter().map(RmlNode::to_text_node).collect(),
        }
    }

    pub fn from_text_node(node: &TextNode) -> Self {
        Self {
            name: node.tag.clone(),
            value: node.text.clone(),
            attributes: node
                .attributes
                .iter()
                .map(|(name, value)| RmlAttribute {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            children: node.children.iter().map(RmlNode::from_text_node).collect(),
        }
    }
}

impl RmlDocument {
    pub fn new(root: RmlNode) -> Self {
        Self { flags: 0, root }
    }

    /// `<rml flags="..">` с корнем внутри.
    pub fn to_text_node(&self) -> TextNode {
        let mut wrapper = TextNode::new(RML_TAG);
        if self.flags != 0 {
            wrapper.set_attribute(FLAGS_ATTR, format!("{:02X}", self.flags));
        }
        wrapper.children.push(self.root.to_text_node());
        wrapper
    }

    /// Обратное к [`RmlDocument::to_text_node`]: обёртка с ровно одним
    /// корнем.
    pub fn from_text_node(wrapper: &TextNode) -> BinobjResult<Self> {
        if wrapper.tag != RML_TAG {
            return Err(TextError::UnexpectedElement {
                expected: RML_TAG.to_string(),
                found: wrapper.tag.clone(),
            }
            .into());
        }
        let root = match wrapper.children.as_slice() {
            [root] => root,
            other => {
                return Err(FieldError::invalid_value(
                    FieldType::Rml,
                    format!("expected one root element, found {}", other.len()),
                )
                .into())
            }
        };
        let flags = match wrapper.attribute(FLAGS_ATTR) {
            Some(text) => parse_hash(text)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| FieldError::parse(FieldType::Rml, text, "flags must be one hex byte"))?,
            None => 0,
        };
        Ok(Self {
            flags,
            root: RmlNode::from_text_node(root),
        })
    }
}
