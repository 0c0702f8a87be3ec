use std::collections::HashMap;

use binobj_error::BinobjResult;
use tracing::{debug, trace};

use super::{
    definitions::{ClassDefinition, ClassId, FieldDefinition, ObjectFileDefinition},
    predicate::AncestorChain,
};
use crate::{
    document::Node,
    fields::{registry, FieldSpec, FieldType, FieldValue},
};

/// Граф схемы: классы в арене и словари для поиска.
///
/// Строится [`SchemaBuilder`](super::SchemaBuilder) и после этого не
/// меняется, поэтому его можно разделять между потоками.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub(crate) classes: Vec<ClassDefinition>,
    pub(crate) roots_by_hash: HashMap<u32, ClassId>,
    pub(crate) roots_by_name: HashMap<String, ClassId>,
    /// Все классы с хешем; при совпадении побеждает первый (корни идут
    /// раньше вложенных).
    pub(crate) flat: HashMap<u32, ClassId>,
    pub(crate) object_files: Vec<ObjectFileDefinition>,
    pub(crate) aliases: HashMap<String, usize>,
}

impl SchemaGraph {
    /// Пустая схема: все узлы безымянны, все поля `BinHex`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// # Panics
    /// Если `id` получен от другого графа.
    pub fn class(
        &self,
        id: ClassId,
    ) -> &ClassDefinition {
        &self.classes[id.0]
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDefinition)> {
        self.classes.iter().enumerate().map(|(i, c)| (ClassId(i), c))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn root_class(
        &self,
        hash: u32,
    ) -> Option<ClassId> {
        self.roots_by_hash.get(&hash).copied()
    }

    pub fn root_class_by_name(
        &self,
        name: &str,
    ) -> Option<ClassId> {
        self.roots_by_name.get(name).copied()
    }

    /// Поиск по хешу среди всех классов схемы.
    pub fn class_by_hash(
        &self,
        hash: u32,
    ) -> Option<ClassId> {
        self.flat.get(&hash).copied()
    }

    /// Файл объектов по имени или псевдониму, регистр не важен.
    pub fn object_file(
        &self,
        alias: &str,
    ) -> Option<&ObjectFileDefinition> {
        self.aliases
            .get(&alias.to_lowercase())
            .map(|&i| &self.object_files[i])
    }

    pub fn object_files(&self) -> &[ObjectFileDefinition] {
        &self.object_files
    }

    /// Описание поля: сначала в самом классе, затем в друзьях, чьё условие
    /// выполняется для `ancestors`.
    pub fn field_definition(
        &self,
        class: ClassId,
        hash: u32,
        ancestors: &AncestorChain<'_>,
    ) -> Option<&FieldDefinition> {
        self.resolve(class, ancestors, &mut Vec::new(), &|c| c.fields.get(&hash))
    }

    /// Класс вложенного объекта с хешем `hash`, с тем же обходом друзей.
    pub fn object_definition(
        &self,
        class: ClassId,
        hash: u32,
        ancestors: &AncestorChain<'_>,
    ) -> Option<ClassId> {
        self.resolve(class, ancestors, &mut Vec::new(), &|c| c.objects.get(&hash).copied())
    }

    fn resolve<'s, T, F>(
        &'s self,
        class: ClassId,
        ancestors: &AncestorChain<'_>,
        visited: &mut Vec<ClassId>,
        local: &F,
    ) -> Option<T>
    where
        F: Fn(&'s ClassDefinition) -> Option<T>,
    {
        // Дружба может быть циклической.
        if visited.contains(&class) {
            return None;
        }
        visited.push(class);
        let definition = self.classes.get(class.0)?;
        if let Some(hit) = local(definition) {
            return Some(hit);
        }
        for friend in &definition.friends {
            if let Some(predicate) = &friend.predicate {
                if !predicate.matches(ancestors) {
                    trace!(friend = %friend.name, path = %predicate.path.text, "friend predicate does not hold");
                    continue;
                }
            }
            if let Some(hit) = self.resolve(friend.class, ancestors, visited, local) {
                return Some(hit);
            }
        }
        None
    }

    /// Класс, выбранный значением поля-дискриминатора `value`.
    ///
    /// Значение читается как `UInt32` и ищется среди всех классов. `None`,
    /// если такого класса нет.
    pub fn discriminated_class(
        &self,
        class: ClassId,
        value: &[u8],
    ) -> BinobjResult<Option<ClassId>> {
        let Some(discriminator) = &self.class(class).discriminator else {
            return Ok(Some(class));
        };
        let decoded = registry().deserialize_exact(
            FieldType::UInt32,
            &FieldSpec::default(),
            &discriminator.label(),
            value,
        )?;
        let FieldValue::UInt(hash) = decoded else {
            return Ok(None);
        };
        let found = u32::try_from(hash).ok().and_then(|h| self.class_by_hash(h));
        if found.is_none() {
            debug!(
                class = %self.class(class).label(),
                discriminator = hash,
                "discriminator does not name a known class"
            );
        }
        Ok(found)
    }

    /// Эффективный класс узла: статический класс, уточнённый
    /// дискриминатором, если у класса он есть и узел несёт это поле.
    pub fn effective_class(
        &self,
        class: Option<ClassId>,
        node: &Node,
    ) -> BinobjResult<Option<ClassId>> {
        let Some(id) = class else {
            return Ok(None);
        };
        let Some(discriminator) = &self.class(id).discriminator else {
            return Ok(Some(id));
        };
        match node.field(discriminator.hash) {
            Some(value) => self.discriminated_class(id, value),
            None => Ok(Some(id)),
        }
    }

    /// Класс ребёнка с хешем `hash`, если эффективный класс родителя
    /// `parent`. Для классов с динамическими детьми поиск идёт по всей
    /// схеме.
    pub fn child_class(
        &self,
        parent: Option<ClassId>,
        hash: u32,
        ancestors: &AncestorChain<'_>,
    ) -> Option<ClassId> {
        let parent = parent?;
        if self.class(parent).dynamic_nested_classes {
            self.class_by_hash(hash)
        } else {
            self.object_definition(parent, hash, ancestors)
        }
    }
}
