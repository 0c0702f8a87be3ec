//! `Array32`: счётчик элементов (u32 LE), затем элементы подряд.
//!
//! Элементы кодируются обработчиком типа элемента в поэлементном режиме.
//! В тексте каждый элемент становится дочерним элементом `item`.

use binobj_error::{BinobjResult, FieldError, ResultExt};

use super::{
    registry::{registry, take},
    FieldHandler, FieldSpec, FieldType, FieldValue,
};
use crate::text::TextNode;

pub const ITEM_TAG: &str = "item";

#[derive(Debug, Clone, Copy, Default)]
pub struct Array32Handler;

/// Обработчик элемента и контекст для него. Перечисление родителя
/// передаётся элементам.
fn element<'s>(spec: &FieldSpec<'s>) -> BinobjResult<(&'static dyn FieldHandler, FieldSpec<'s>)> {
    let element_type = spec.element_type.ok_or_else(|| {
        FieldError::invalid_value(FieldType::Array32, "element type is not declared")
    })?;
    if !element_type.is_array_element() {
        return Err(FieldError::not_supported(element_type, "array element").into());
    }
    let element_spec = FieldSpec {
        enumeration: spec.enumeration,
        element_type: None,
    };
    Ok((registry().handler(element_type)?, element_spec))
}

fn read_count(bytes: &[u8]) -> Result<usize, FieldError> {
    let b = take(FieldType::Array32, bytes, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
}

fn write_count(
    out: &mut Vec<u8>,
    count: usize,
) -> Result<(), FieldError> {
    let count = u32::try_from(count).map_err(|_| {
        FieldError::invalid_value(FieldType::Array32, format!("{count} elements do not fit in u32"))
    })?;
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

impl FieldHandler for Array32Handler {
    fn field_type(&self) -> FieldType {
        FieldType::Array32
    }

    fn serialize(
        &self,
        spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        let FieldValue::Array(items) = value else {
            return Err(FieldError::value_mismatch(FieldType::Array32, value.kind()).into());
        };
        let (handler, element_spec) = element(spec)?;
        let mut out = Vec::with_capacity(4 + items.len());
        write_count(&mut out, items.len())?;
        for item in items {
            out.extend(handler.serialize_element(&element_spec, item)?);
        }
        Ok(out)
    }

    fn deserialize(
        &self,
        spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let (handler, element_spec) = element(spec)?;
        let count = read_count(bytes)?;
        let mut pos = 4;
        // Счётчик из данных не должен управлять размером аллокации.
        let mut items = Vec::with_capacity(count.min(bytes.len()));
        for i in 0..count {
            let (item, consumed) = handler
                .deserialize_element(&element_spec, &bytes[pos..])
                .with_context(|| format!("array element {i} of {count}"))?;
            items.push(item);
            pos += consumed;
        }
        Ok((FieldValue::Array(items), pos))
    }

    fn serialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        _value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Err(FieldError::not_supported(FieldType::Array32, "array element").into())
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        _bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        Err(FieldError::not_supported(FieldType::Array32, "array element").into())
    }

    fn import(
        &self,
        spec: &FieldSpec<'_>,
        node: &TextNode,
    ) -> BinobjResult<Vec<u8>> {
        let (handler, element_spec) = element(spec)?;
        let items: Vec<&TextNode> = node.children_named(ITEM_TAG).collect();
        let mut out = Vec::with_capacity(4 + items.len());
        write_count(&mut out, items.len())?;
        for (i, item) in items.into_iter().enumerate() {
            let value = handler
                .parse(&element_spec, &item.text)
                .with_context(|| format!("array item {i}"))?;
            out.extend(handler.serialize_element(&element_spec, &value)?);
        }
        Ok(out)
    }

    fn export(
        &self,
        spec: &FieldSpec<'_>,
        bytes: &[u8],
        out: &mut TextNode,
    ) -> BinobjResult<usize> {
        let (handler, element_spec) = element(spec)?;
        let count = read_count(bytes)?;
        let mut pos = 4;
        for i in 0..count {
            let (value, consumed) = handler
                .deserialize_element(&element_spec, &bytes[pos..])
                .with_context(|| format!("array element {i} of {count}"))?;
            let mut item = TextNode::new(ITEM_TAG);
            item.text = handler.compose(&element_spec, &value)?;
            out.children.push(item);
            pos += consumed;
        }
        Ok(pos)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
