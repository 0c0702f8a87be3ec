use binobj_error::{BinobjResult, FieldError, TextError};

use super::{FieldHandler, FieldSpec, FieldType, FieldValue};
use crate::{
    rml::{read_rml, write_rml, RmlDocument, RML_TAG},
    text::TextNode,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RmlHandler;

impl FieldHandler for RmlHandler {
    fn field_type(&self) -> FieldType {
        FieldType::Rml
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        match value {
            FieldValue::Rml(doc) => write_rml(doc),
            other => Err(FieldError::value_mismatch(FieldType::Rml, other.kind()).into()),
        }
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let (doc, consumed) = read_rml(bytes)?;
        Ok((FieldValue::Rml(doc), consumed))
    }

    fn serialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        _value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Err(FieldError::not_supported(FieldType::Rml, "array element").into())
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        _bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        Err(FieldError::not_supported(FieldType::Rml, "array element").into())
    }

    /// Ждёт ровно один дочерний элемент `rml` с корнем разметки внутри.
    fn import(
        &self,
        _spec: &FieldSpec<'_>,
        node: &TextNode,
    ) -> BinobjResult<Vec<u8>> {
        let wrapper = node.first_child(RML_TAG).ok_or_else(|| TextError::UnexpectedElement {
            expected: RML_TAG.to_string(),
            found: node
                .children
                .first()
                .map(|c| c.tag.clone())
                .unwrap_or_else(|| "no element".to_string()),
        })?;
        write_rml(&RmlDocument::from_text_node(wrapper)?)
    }

    fn export(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
        out: &mut TextNode,
    ) -> BinobjResult<usize> {
        let (doc, consumed) = read_rml(bytes)?;
        out.children.push(doc.to_text_node());
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rml::{RmlAttribute, RmlNode};

    #[test]
    fn test_rml_field_text_round_trip() {
        let mut root = RmlNode::new("quest");
        root.attributes.push(RmlAttribute {
            name: "id".into(),
            value: "7".into(),
        });
        let mut step = RmlNode::new("step");
        step.value = "Find the key".into();
        root.children.push(step);
        let bytes = write_rml(&RmlDocument { flags: 2, root }).unwrap();

        let spec = FieldSpec::default();
        let mut field = TextNode::new("field");
        assert_eq!(RmlHandler.export(&spec, &bytes, &mut field).unwrap(), bytes.len());

        let wrapper = field.first_child(RML_TAG).unwrap();
        assert_eq!(wrapper.attribute("flags"), Some("02"));
        assert_eq!(wrapper.children[0].tag, "quest");

        assert_eq!(RmlHandler.import(&spec, &field).unwrap(), bytes);
    }

    #[test]
    fn test_rml_import_requires_wrapper() {
        let mut field = TextNode::new("field");
        field.children.push(TextNode::new("quest"));
        assert!(RmlHandler.import(&FieldSpec::default(), &field).is_err());
    }
}
