//! Сырые описания схемы в том виде, в каком они лежат в файлах.
//!
//! ```xml
//! <class name="Entity" class_field_name="Type">
//!   <field name="Label" type="String"/>
//!   <field name="Mode" type="Enum">
//!     <enum><element name="Idle" value="0"/></enum>
//!   </field>
//!   <object name="Transform">...</object>
//!   <friend name="Physics" condition_field="^Kind" condition_type="String" condition_value="Body"/>
//! </class>
//!
//! <object_file name="EntityLibrary">
//!   <alias>entities</alias>
//!   <object>...</object>
//! </object_file>
//! ```
//!
//! Хеши записываются шестнадцатеричными числами. Проверка и разрешение
//! ссылок выполняются в [`SchemaBuilder`](super::SchemaBuilder).

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawEnumElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@value")]
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawEnum {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "element", default)]
    pub elements: Vec<RawEnumElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawField {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@hash", default)]
    pub hash: Option<String>,
    /// По умолчанию `BinHex`.
    #[serde(rename = "@type", default)]
    pub field_type: Option<String>,
    #[serde(rename = "@array_type", default)]
    pub array_type: Option<String>,
    #[serde(rename = "enum", default)]
    pub enumeration: Option<RawEnum>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawFriend {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@condition_field", default)]
    pub condition_field: Option<String>,
    #[serde(rename = "@condition_type", default)]
    pub condition_type: Option<String>,
    #[serde(rename = "@condition_value", default)]
    pub condition_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawClass {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@hash", default)]
    pub hash: Option<String>,
    #[serde(rename = "@dynamic_nested_classes", default)]
    pub dynamic_nested_classes: bool,
    #[serde(rename = "@class_field_name", default)]
    pub class_field_name: Option<String>,
    #[serde(rename = "@class_field_hash", default)]
    pub class_field_hash: Option<String>,
    #[serde(rename = "field", default)]
    pub fields: Vec<RawField>,
    #[serde(rename = "object", default)]
    pub objects: Vec<RawClass>,
    #[serde(rename = "friend", default)]
    pub friends: Vec<RawFriend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawObjectFile {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "alias", default)]
    pub aliases: Vec<String>,
    #[serde(rename = "object", default)]
    pub object: Option<RawClass>,
}

impl RawClass {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        self.fields.push(RawField {
            name: Some(name.into()),
            field_type: Some(field_type.into()),
            ..Default::default()
        });
        self
    }

    pub fn with_object(
        mut self,
        object: RawClass,
    ) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_friend(
        mut self,
        friend: RawFriend,
    ) -> Self {
        self.friends.push(friend);
        self
    }
}

impl RawFriend {
    pub fn to(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn when(
        mut self,
        field: impl Into<String>,
        field_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.condition_field = Some(field.into());
        self.condition_type = Some(field_type.into());
        self.condition_value = Some(value.into());
        self
    }
}
