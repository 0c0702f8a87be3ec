//! Schema graph.
//!
//! Схема описывает классы узлов: их поля (имя, тип, перечисление), вложенные
//! объекты, друзей с условиями и поле-дискриминатор. Граф строится один раз
//! и дальше используется только для чтения.

pub mod builder;
pub mod definitions;
pub mod graph;
pub mod loader;
pub mod predicate;
pub mod raw;

pub use builder::SchemaBuilder;
pub use definitions::{
    ClassDefinition, ClassId, Discriminator, EnumDefinition, EnumElement, FieldDefinition,
    FriendDefinition, ObjectFileDefinition,
};
pub use graph::SchemaGraph;
pub use loader::{load_dir, parse_class, parse_object_file};
pub use predicate::{AncestorChain, Predicate, PredicatePath};
pub use raw::{RawClass, RawEnum, RawEnumElement, RawField, RawFriend, RawObjectFile};
