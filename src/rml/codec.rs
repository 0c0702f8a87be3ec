//! Бинарная форма RML.
//!
//! ```text
//! 0x00 | flags | string table size | node count | attribute count
//! node: name | value | attribute count | child count | attributes | children
//! attribute: reserved (0) | name | value
//! string table: строки с завершающим нулём
//! ```
//!
//! Все числа, кроме первых двух байт, упакованы как VarCount и обязаны быть
//! литералами. Имена и значения задаются смещениями в таблице строк, которая
//! следует за деревом.

use std::collections::HashMap;

use binobj_error::{ensure, BinobjResult, FormatError};

use super::{RmlAttribute, RmlDocument, RmlNode};
use crate::{
    document::decode::DEFAULT_MAX_DEPTH,
    wire::{write_varcount, ByteReader, VarCount},
};

/// Минимальная длина значения: два байта заголовка и три счётчика.
pub const RML_MIN_LEN: usize = 5;

struct RawAttribute {
    name: u32,
    value: u32,
}

struct RawNode {
    name: u32,
    value: u32,
    attributes: Vec<RawAttribute>,
    children: Vec<RawNode>,
}

/// Декодирует RML, возвращает документ и число прочитанных байт.
pub fn read_rml(bytes: &[u8]) -> BinobjResult<(RmlDocument, usize)> {
    if bytes.len() < RML_MIN_LEN {
        return Err(FormatError::unexpected_eof(
            "rml header",
            RML_MIN_LEN as u64,
            bytes.len() as u64,
        )
        .with_offset(0)
        .into());
    }
    let mut reader = ByteReader::new(bytes);
    let lead = reader.read_u8("rml lead byte")?;
    ensure!(
        lead == 0,
        FormatError::corrupted(format!("rml lead byte is 0x{lead:02X}, expected 0")).with_offset(0)
    );
    let flags = reader.read_u8("rml flags")?;
    let table_size = read_packed(&mut reader, "rml string table size")? as usize;
    let declared_nodes = read_packed(&mut reader, "rml node count")? as usize;
    let declared_attributes = read_packed(&mut reader, "rml attribute count")? as usize;

    let mut tree = TreeReader {
        reader,
        declared_nodes,
        declared_attributes,
        nodes: 0,
        attributes: 0,
    };
    let raw_root = tree.read_node(0)?;
    ensure!(
        tree.nodes == declared_nodes,
        FormatError::CountMismatch {
            what: "rml nodes".to_string(),
            declared: declared_nodes as u64,
            actual: tree.nodes as u64,
        }
    );
    ensure!(
        tree.attributes == declared_attributes,
        FormatError::CountMismatch {
            what: "rml attributes".to_string(),
            declared: declared_attributes as u64,
            actual: tree.attributes as u64,
        }
    );

    let mut reader = tree.reader;
    let table_offset = reader.position();
    let table = StringTable {
        data: reader.read_bytes(table_size, "rml string table")?,
        offset: table_offset,
    };
    let root = table.resolve(&raw_root)?;
    Ok((RmlDocument { flags, root }, reader.position()))
}

fn read_packed(
    reader: &mut ByteReader<'_>,
    what: &str,
) -> Result<u32, FormatError> {
    let offset = reader.position() as u64;
    match reader.read_varcount(what)? {
        VarCount::Literal(v) => Ok(v),
        VarCount::Reference(_) => Err(FormatError::ReferenceNotAllowed {
            what: what.to_string(),
            offset: Some(offset),
            subject: None,
        }),
    }
}

struct TreeReader<'a> {
    reader: ByteReader<'a>,
    declared_nodes: usize,
    declared_attributes: usize,
    nodes: usize,
    attributes: usize,
}

impl TreeReader<'_> {
    fn read_node(
        &mut self,
        depth: usize,
    ) -> Result<RawNode, FormatError> {
        let offset = self.reader.position() as u64;
        if depth > DEFAULT_MAX_DEPTH {
            return Err(FormatError::DepthLimit {
                depth,
                limit: DEFAULT_MAX_DEPTH,
                offset: Some(offset),
            });
        }
        self.nodes += 1;
        if self.nodes > self.declared_nodes {
            return Err(FormatError::corrupted(format!(
                "more than {} rml nodes",
                self.declared_nodes
            ))
            .with_offset(offset));
        }

        let name = read_packed(&mut self.reader, "rml node name")?;
        let value = read_packed(&mut self.reader, "rml node value")?;
        let attribute_count = read_packed(&mut self.reader, "rml node attribute count")? as usize;
        let child_count = read_packed(&mut self.reader, "rml node child count")? as usize;

        self.attributes += attribute_count;
        if self.attributes > self.declared_attributes {
            return Err(FormatError::corrupted(format!(
                "more than {} rml attributes",
                self.declared_attributes
            ))
            .with_offset(offset));
        }

        // Атрибут занимает не меньше трёх байт.
        let mut attributes = Vec::with_capacity(attribute_count.min(self.reader.remaining() / 3));
        for _ in 0..attribute_count {
            let reserved_offset = self.reader.position() as u64;
            let reserved = read_packed(&mut self.reader, "rml attribute reserved")?;
            if reserved != 0 {
                return Err(FormatError::corrupted(format!(
                    "rml attribute reserved value is {reserved}, expected 0"
                ))
                .with_offset(reserved_offset));
            }
            attributes.push(RawAttribute {
                name: read_packed(&mut self.reader, "rml attribute name")?,
                value: read_packed(&mut self.reader, "rml attribute value")?,
            });
        }

        // Узел занимает не меньше четырёх байт.
        let mut children = Vec::with_capacity(child_count.min(self.reader.remaining() / 4));
        for _ in 0..child_count {
            children.push(self.read_node(depth + 1)?);
        }
        Ok(RawNode {
            name,
            value,
            attributes,
            children,
        })
    }
}

struct StringTable<'a> {
    data: &'a [u8],
    /// Смещение таблицы внутри значения, для сообщений об ошибках.
    offset: usize,
}

impl StringTable<'_> {
    fn string(
        &self,
        index: u32,
    ) -> Result<String, FormatError> {
        let start = index as usize;
        let at = (self.offset + start) as u64;
        let tail = self.data.get(start..).filter(|t| !t.is_empty()).ok_or_else(|| {
            FormatError::corrupted(format!(
                "string offset {index} is outside the table of {} bytes",
                self.data.len()
            ))
            .with_offset(self.offset as u64)
        })?;
        let end = tail.iter().position(|&b| b == 0).ok_or_else(|| {
            FormatError::corrupted("unterminated string in rml table").with_offset(at)
        })?;
        std::str::from_utf8(&tail[..end])
            .map(str::to_string)
            .map_err(|e| FormatError::corrupted(e.to_string()).with_offset(at))
    }

    fn resolve(
        &self,
        raw: &RawNode,
    ) -> Result<RmlNode, FormatError> {
        let attributes = raw
            .attributes
            .iter()
            .map(|a| {
                Ok(RmlAttribute {
                    name: self.string(a.name)?,
                    value: self.string(a.value)?,
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;
        let children = raw
            .children
            .iter()
            .map(|c| self.resolve(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RmlNode {
            name: self.string(raw.name)?,
            value: self.string(raw.value)?,
            attributes,
            children,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Кодирование
////////////////////////////////////////////////////////////////////////////////

/// Кодирует документ. Одинаковые строки попадают в таблицу один раз.
pub fn write_rml(document: &RmlDocument) -> BinobjResult<Vec<u8>> {
    let mut strings = StringInterner::default();
    strings.collect(&document.root);

    let mut out = vec![0, document.flags];
    write_varcount(&mut out, to_u32(strings.data.len())?)?;
    write_varcount(&mut out, to_u32(document.root.node_count())?)?;
    write_varcount(&mut out, to_u32(document.root.attribute_count())?)?;
    write_node(&mut out, &document.root, &strings)?;
    out.extend_from_slice(&strings.data);
    Ok(out)
}

fn write_node(
    out: &mut Vec<u8>,
    node: &RmlNode,
    strings: &StringInterner,
) -> BinobjResult<()> {
    write_varcount(out, strings.offset(&node.name))?;
    write_varcount(out, strings.offset(&node.value))?;
    write_varcount(out, to_u32(node.attributes.len())?)?;
    write_varcount(out, to_u32(node.children.len())?)?;
    for attribute in &node.attributes {
        write_varcount(out, 0)?;
        write_varcount(out, strings.offset(&attribute.name))?;
        write_varcount(out, strings.offset(&attribute.value))?;
    }
    for child in &node.children {
        write_node(out, child, strings)?;
    }
    Ok(())
}

fn to_u32(n: usize) -> Result<u32, FormatError> {
    u32::try_from(n).map_err(|_| FormatError::corrupted(format!("rml count {n} exceeds u32")))
}

#[derive(Default)]
struct StringInterner {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringInterner {
    /// Обходит дерево в pre-order и добавляет строки в порядке появления.
    fn collect(
        &mut self,
        node: &RmlNode,
    ) {
        self.intern(&node.name);
        self.intern(&node.value);
        for attribute in &node.attributes {
            self.intern(&attribute.name);
            self.intern(&attribute.value);
        }
        for child in &node.children {
            self.collect(child);
        }
    }

    fn intern(
        &mut self,
        s: &str,
    ) {
        if self.offsets.contains_key(s) {
            return;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.offsets.insert(s.to_string(), offset);
    }

    fn offset(
        &self,
        s: &str,
    ) -> u32 {
        // Все строки дерева собраны в `collect` до записи.
        self.offsets.get(s).copied().unwrap_or_default()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RmlDocument {
        let mut root = RmlNode::new("dialog");
        root.attributes.push(RmlAttribute {
            name: "id".into(),
            value: "intro".into(),
        });
        let mut line = RmlNode::new("line");
        line.value = "Hello".into();
        line.attributes.push(RmlAttribute {
            name: "id".into(),
            value: "1".into(),
        });
        root.children.push(line);
        RmlDocument { flags: 0x11, root }
    }

    #[test]
    fn test_layout() {
        let bytes = write_rml(&sample()).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 0x11);
        // Таблица: dialog, "", id, intro, line, Hello, 1.
        let table = b"dialog\0\0id\0intro\0line\0Hello\01\0";
        assert_eq!(bytes[2] as usize, table.len());
        assert_eq!(bytes[3], 2);
        assert_eq!(bytes[4], 2);
        assert!(bytes.ends_with(table));
    }

    #[test]
    fn test_decode_reports_consumed() {
        let doc = sample();
        let mut bytes = write_rml(&doc).unwrap();
        let len = bytes.len();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let (back, consumed) = read_rml(&bytes).unwrap();
        assert_eq!(back, doc);
        assert_eq!(consumed, len);
    }

    #[test]
    fn test_rejects_short_and_bad_lead() {
        assert!(read_rml(&[0, 0, 0, 1]).is_err());
        let mut bytes = write_rml(&sample()).unwrap();
        bytes[0] = 1;
        assert!(read_rml(&bytes).is_err());
    }

    #[test]
    fn test_rejects_count_mismatch() {
        let mut bytes = write_rml(&sample()).unwrap();
        bytes[3] = 3; // объявлено три узла, в дереве два
        let err = read_rml(&bytes).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::CountMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_reference_token() {
        let mut bytes = write_rml(&sample()).unwrap();
        // Счётчик узлов заменён ссылкой.
        bytes.splice(3..4, [0xFE, 0, 0, 0, 0]);
        let err = read_rml(&bytes).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::ReferenceNotAllowed { .. })
        ));
    }

    /// Узел `a` с одним атрибутом `a=a`: таблица из одной строки.
    fn one_attribute() -> Vec<u8> {
        let mut root = RmlNode::new("a");
        root.value = "a".into();
        root.attributes.push(RmlAttribute {
            name: "a".into(),
            value: "a".into(),
        });
        write_rml(&RmlDocument::new(root)).unwrap()
    }

    #[test]
    fn test_rejects_nonzero_reserved_word() {
        let mut bytes = one_attribute();
        assert!(read_rml(&bytes).is_ok());
        // Заголовок 5 байт, узел 4 байта, затем reserved первого атрибута.
        assert_eq!(bytes[9], 0);
        bytes[9] = 7;
        let err = read_rml(&bytes).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_huge_declared_counts_fail_without_allocating() {
        let mut bytes = vec![0, 0, 0];
        write_varcount(&mut bytes, 1).unwrap();
        write_varcount(&mut bytes, u32::MAX).unwrap();
        // Узел: имя, значение, u32::MAX атрибутов, u32::MAX детей.
        bytes.extend_from_slice(&[0, 0]);
        write_varcount(&mut bytes, u32::MAX).unwrap();
        write_varcount(&mut bytes, u32::MAX).unwrap();
        let err = read_rml(&bytes).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_rejects_offset_outside_table() {
        let mut root = RmlNode::new("a");
        root.value = "b".into();
        let mut bytes = write_rml(&RmlDocument::new(root)).unwrap();
        // name index лежит сразу после трёх счётчиков.
        bytes[5] = 40;
        assert!(read_rml(&bytes).is_err());
    }
}
