use std::fmt;

use indexmap::IndexMap;

use super::predicate::Predicate;
use crate::{
    fields::{FieldSpec, FieldType},
    text::format_hash,
};

/// Индекс класса в арене графа схемы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Имя для сообщений: имя, если есть, иначе хеш.
pub(crate) fn label(
    name: Option<&str>,
    hash: Option<u32>,
) -> String {
    match (name, hash) {
        (Some(name), _) => name.to_string(),
        (None, Some(hash)) => format_hash(hash),
        (None, None) => "<anonymous>".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumElement {
    pub name: String,
    pub value: i32,
}

/// Перечисление поля типа `Enum`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumDefinition {
    pub name: Option<String>,
    pub elements: Vec<EnumElement>,
}

impl EnumDefinition {
    pub fn new(
        name: Option<String>,
        elements: Vec<(String, i32)>,
    ) -> Self {
        Self {
            name,
            elements: elements
                .into_iter()
                .map(|(name, value)| EnumElement { name, value })
                .collect(),
        }
    }

    pub fn name_of(
        &self,
        value: i32,
    ) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.name.as_str())
    }

    pub fn value_of(
        &self,
        name: &str,
    ) -> Option<i32> {
        self.elements.iter().find(|e| e.name == name).map(|e| e.value)
    }
}

/// Описание поля класса.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: Option<String>,
    pub hash: u32,
    pub field_type: FieldType,
    /// Тип элемента, только для `Array32`.
    pub element_type: Option<FieldType>,
    pub enumeration: Option<EnumDefinition>,
}

impl FieldDefinition {
    pub fn spec(&self) -> FieldSpec<'_> {
        FieldSpec {
            enumeration: self.enumeration.as_ref(),
            element_type: self.element_type,
        }
    }

    pub fn label(&self) -> String {
        label(self.name.as_deref(), Some(self.hash))
    }
}

/// Поле, значение которого выбирает конкретный класс узла.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub name: Option<String>,
    pub hash: u32,
}

impl Discriminator {
    pub fn label(&self) -> String {
        label(self.name.as_deref(), Some(self.hash))
    }
}

/// Ссылка на другой корневой класс, у которого класс заимствует поля и
/// вложенные объекты, возможно при условии.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendDefinition {
    pub class: ClassId,
    pub name: String,
    pub predicate: Option<Predicate>,
}

/// Класс: именованный тип узла.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDefinition {
    pub name: Option<String>,
    /// Отсутствует только у анонимного корня файла объектов.
    pub hash: Option<u32>,
    pub fields: IndexMap<u32, FieldDefinition>,
    /// Вложенные классы по хешу узла.
    pub objects: IndexMap<u32, ClassId>,
    pub friends: Vec<FriendDefinition>,
    /// Дети разрешаются глобально по хешу, а не через `objects`.
    pub dynamic_nested_classes: bool,
    pub discriminator: Option<Discriminator>,
}

impl ClassDefinition {
    pub fn label(&self) -> String {
        label(self.name.as_deref(), self.hash)
    }
}

/// Тип файла объектов: имя, псевдонимы и класс корня.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFileDefinition {
    pub name: String,
    /// Все имена файла в нижнем регистре, включая `name`.
    pub aliases: Vec<String>,
    pub root: Option<ClassId>,
}
