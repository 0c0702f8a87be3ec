//! Условия дружбы классов.
//!
//! Путь условия: необязательные `^` (подняться на столько предков от
//! текущего узла), затем имена дочерних узлов через `.`, последний сегмент
//! имя поля. Условие истинно, если байты поля совпадают с заранее
//! закодированным значением.

use binobj_error::SchemaError;

use crate::{
    document::{Document, Node, NodeId},
    fields::FieldType,
    hashing::crc32,
};

/// Цепочка узлов от корня до текущего (последний элемент).
#[derive(Debug, Clone, Copy)]
pub struct AncestorChain<'a> {
    pub document: &'a Document,
    pub chain: &'a [NodeId],
}

impl<'a> AncestorChain<'a> {
    pub fn new(
        document: &'a Document,
        chain: &'a [NodeId],
    ) -> Self {
        Self { document, chain }
    }

    /// Узел на `up` уровней выше текущего.
    pub fn ancestor(
        &self,
        up: usize,
    ) -> Option<&'a Node> {
        let index = self.chain.len().checked_sub(up + 1)?;
        self.document.get(self.chain[index])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicatePath {
    pub text: String,
    pub up: usize,
    /// Хеши дочерних узлов по пути.
    pub children: Vec<u32>,
    pub field: u32,
}

impl PredicatePath {
    pub fn parse(
        class: &str,
        text: &str,
    ) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidPredicate {
            class: class.to_string(),
            reason: format!("{reason} in path '{text}'"),
        };
        let trimmed = text.trim();
        let rest = trimmed.trim_start_matches('^');
        let up = trimmed.len() - rest.len();
        let mut segments: Vec<&str> = rest.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty segment"));
        }
        let field = segments.pop().ok_or_else(|| invalid("missing field"))?;
        Ok(Self {
            text: trimmed.to_string(),
            up,
            children: segments.into_iter().map(crc32).collect(),
            field: crc32(field),
        })
    }
}

/// Условие `path == value` для ссылки на дружественный класс.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub path: PredicatePath,
    pub field_type: FieldType,
    pub value: String,
    /// `value`, закодированное типом `field_type`.
    pub expected: Vec<u8>,
}

impl Predicate {
    pub fn matches(
        &self,
        ancestors: &AncestorChain<'_>,
    ) -> bool {
        let Some(mut node) = ancestors.ancestor(self.path.up) else {
            return false;
        };
        let document = ancestors.document;
        for &hash in &self.path.children {
            let next = node
                .children()
                .iter()
                .filter_map(|&c| document.get(c))
                .find(|c| c.hash() == hash);
            match next {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.field(self.path.field) == Some(self.expected.as_slice())
    }
}
