use std::collections::HashMap;

use binobj_error::{BinobjResult, FieldError, ResultExt};
use once_cell::sync::Lazy;

use super::{
    array::Array32Handler, binhex::BinHexHandler, boolean::BooleanHandler, enums::EnumHandler,
    float::FloatHandler, ids::IdHandler, ints::IntHandler, rml::RmlHandler,
    string::StringHandler, vector::VectorHandler, FieldType, FieldValue,
};
use crate::{schema::EnumDefinition, text::TextNode};

/// Контекст поля, который нужен отдельным обработчикам: перечисление для
/// `Enum` и тип элемента для `Array32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSpec<'a> {
    pub enumeration: Option<&'a EnumDefinition>,
    pub element_type: Option<FieldType>,
}

impl<'a> FieldSpec<'a> {
    pub fn with_enumeration(enumeration: &'a EnumDefinition) -> Self {
        Self {
            enumeration: Some(enumeration),
            element_type: None,
        }
    }

    pub fn array_of(element_type: FieldType) -> Self {
        Self {
            enumeration: None,
            element_type: Some(element_type),
        }
    }
}

/// Обработчик одного типа поля.
///
/// `deserialize` возвращает значение и число потреблённых байт; реестр
/// проверяет, что потреблено всё. Поэлементные варианты используются внутри
/// `Array32`, где значения идут подряд без длины и пишутся фиксированной
/// шириной.
pub trait FieldHandler: Send + Sync {
    fn field_type(&self) -> FieldType;

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        _text: &str,
    ) -> BinobjResult<FieldValue> {
        Err(FieldError::not_supported(self.field_type(), "parse").into())
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        _value: &FieldValue,
    ) -> BinobjResult<String> {
        Err(FieldError::not_supported(self.field_type(), "compose").into())
    }

    fn serialize(
        &self,
        spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>>;

    fn deserialize(
        &self,
        spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)>;

    fn serialize_element(
        &self,
        spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        self.serialize(spec, value)
    }

    fn deserialize_element(
        &self,
        spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        self.deserialize(spec, bytes)
    }

    /// Текстовый элемент поля -> байты.
    fn import(
        &self,
        spec: &FieldSpec<'_>,
        node: &TextNode,
    ) -> BinobjResult<Vec<u8>> {
        let value = self.parse(spec, &node.text)?;
        self.serialize(spec, &value)
    }

    /// Байты -> содержимое текстового элемента `out`. Возвращает число
    /// потреблённых байт.
    fn export(
        &self,
        spec: &FieldSpec<'_>,
        bytes: &[u8],
        out: &mut TextNode,
    ) -> BinobjResult<usize> {
        let (value, consumed) = self.deserialize(spec, bytes)?;
        out.text = self.compose(spec, &value)?;
        Ok(consumed)
    }
}

static REGISTRY: Lazy<FieldCodecRegistry> = Lazy::new(FieldCodecRegistry::standard);

/// Общий реестр со всеми встроенными обработчиками.
pub fn registry() -> &'static FieldCodecRegistry {
    &REGISTRY
}

/// Таблица `FieldType -> обработчик`.
pub struct FieldCodecRegistry {
    handlers: HashMap<FieldType, Box<dyn FieldHandler>>,
}

impl FieldCodecRegistry {
    /// Пустой реестр.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Реестр со всеми встроенными типами.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BinHexHandler));
        registry.register(Box::new(BooleanHandler));
        for ty in [
            FieldType::UInt8,
            FieldType::Int8,
            FieldType::UInt16,
            FieldType::Int16,
            FieldType::UInt32,
            FieldType::Int32,
            FieldType::UInt64,
            FieldType::Int64,
        ] {
            if let Some(handler) = IntHandler::for_type(ty) {
                registry.register(Box::new(handler));
            }
        }
        registry.register(Box::new(FloatHandler));
        for arity in 2..=4 {
            if let Some(handler) = VectorHandler::with_arity(arity) {
                registry.register(Box::new(handler));
            }
        }
        registry.register(Box::new(StringHandler));
        registry.register(Box::new(EnumHandler));
        for ty in [
            FieldType::StringId,
            FieldType::NoCaseStringId,
            FieldType::PathId,
            FieldType::StringId64,
            FieldType::NoCaseStringId64,
            FieldType::PathId64,
        ] {
            if let Some(handler) = IdHandler::for_type(ty) {
                registry.register(Box::new(handler));
            }
        }
        registry.register(Box::new(RmlHandler));
        registry.register(Box::new(Array32Handler));
        registry
    }

    /// Регистрирует обработчик; предыдущий обработчик того же типа
    /// заменяется.
    pub fn register(
        &mut self,
        handler: Box<dyn FieldHandler>,
    ) {
        self.handlers.insert(handler.field_type(), handler);
    }

    pub fn contains(
        &self,
        field_type: FieldType,
    ) -> bool {
        self.handlers.contains_key(&field_type)
    }

    pub fn handler(
        &self,
        field_type: FieldType,
    ) -> BinobjResult<&dyn FieldHandler> {
        self.handlers
            .get(&field_type)
            .map(Box::as_ref)
            .ok_or_else(|| FieldError::not_supported(field_type, "encoding").into())
    }

    pub fn parse(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        self.handler(field_type)?.parse(spec, text)
    }

    pub fn compose(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        self.handler(field_type)?.compose(spec, value)
    }

    pub fn serialize(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        self.handler(field_type)?.serialize(spec, value)
    }

    /// Текст -> байты значения (`parse` + `serialize`).
    pub fn encode_text(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<Vec<u8>> {
        let handler = self.handler(field_type)?;
        let value = handler.parse(spec, text)?;
        handler.serialize(spec, &value)
    }

    /// Декодирует значение поля `field` и требует, чтобы были потреблены
    /// все байты.
    pub fn deserialize_exact(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        field: &str,
        bytes: &[u8],
    ) -> BinobjResult<FieldValue> {
        let (value, consumed) = self
            .handler(field_type)?
            .deserialize(spec, bytes)
            .with_context(|| format!("field '{field}'"))?;
        check_consumed(field, consumed, bytes.len())?;
        Ok(value)
    }

    pub fn import(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        field: &str,
        node: &TextNode,
    ) -> BinobjResult<Vec<u8>> {
        self.handler(field_type)?
            .import(spec, node)
            .with_context(|| format!("field '{field}'"))
    }

    /// Заполняет текстовый элемент поля `out` по его байтам.
    pub fn export(
        &self,
        field_type: FieldType,
        spec: &FieldSpec<'_>,
        field: &str,
        bytes: &[u8],
        out: &mut TextNode,
    ) -> BinobjResult<()> {
        let consumed = self
            .handler(field_type)?
            .export(spec, bytes, out)
            .with_context(|| format!("field '{field}'"))?;
        check_consumed(field, consumed, bytes.len())?;
        Ok(())
    }
}

impl Default for FieldCodecRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn check_consumed(
    field: &str,
    read: usize,
    total: usize,
) -> Result<(), FieldError> {
    if read == total {
        Ok(())
    } else {
        Err(FieldError::Incomplete {
            field: field.to_string(),
            read,
            total,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие помощники обработчиков
////////////////////////////////////////////////////////////////////////////////

/// Первые `n` байт или `BadSize`, если данных меньше.
pub(crate) fn take(
    field_type: FieldType,
    bytes: &[u8],
    n: usize,
) -> Result<&[u8], FieldError> {
    bytes
        .get(..n)
        .ok_or_else(|| FieldError::bad_size(field_type, bytes.len()))
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
