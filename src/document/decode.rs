//! Декодирование бинарного документа.
//!
//! Узлы добавляются в таблицу указателей в порядке создания (pre-order) до
//! рекурсии в детей, поэтому ссылка на узел может указывать только на уже
//! созданный узел. Ссылки на значения полей раскрываются в независимые копии
//! байт.

use binobj_error::{BinobjResult, FormatError};
use tracing::{debug, trace, warn};

use super::{
    header::DocumentHeader,
    node::{Document, Node, NodeId},
};
use crate::wire::{ByteReader, VarCount};

/// Ограничение глубины вложенности по умолчанию.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Параметры декодирования.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Максимальная глубина дерева (корень на глубине 0).
    pub max_depth: usize,
    /// Считать расхождение счётчиков заголовка ошибкой, а не предупреждением.
    pub verify_header_counts: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            verify_header_counts: false,
        }
    }
}

/// Декодирует документ с заголовком с параметрами по умолчанию.
pub fn read_document(bytes: &[u8]) -> BinobjResult<Document> {
    read_document_with(bytes, &DecodeOptions::default())
}

/// Декодирует документ с заголовком.
pub fn read_document_with(
    bytes: &[u8],
    options: &DecodeOptions,
) -> BinobjResult<Document> {
    let mut reader = ByteReader::new(bytes);
    let header = DocumentHeader::read(&mut reader)?;

    let mut decoder = Decoder::new(reader, options);
    let root = decoder.read_node(0)?;

    check_count(
        "objects",
        header.total_object_count,
        decoder.objects,
        options,
    )?;
    check_count("values", header.total_value_count, decoder.values, options)?;

    if decoder.reader.remaining() > 0 {
        debug!(
            trailing = decoder.reader.remaining(),
            "ignoring bytes after the root node"
        );
    }

    let mut document = decoder.document;
    document.root = root;
    debug!(
        nodes = document.len(),
        objects = decoder.objects,
        values = decoder.values,
        "decoded document"
    );
    Ok(document)
}

/// Декодирует одно дерево узлов без заголовка.
///
/// Возвращает документ и кол-во прочитанных байт.
pub fn read_node_tree(
    bytes: &[u8],
    options: &DecodeOptions,
) -> BinobjResult<(Document, usize)> {
    let mut decoder = Decoder::new(ByteReader::new(bytes), options);
    let root = decoder.read_node(0)?;
    let consumed = decoder.reader.position();
    let mut document = decoder.document;
    document.root = root;
    Ok((document, consumed))
}

fn check_count(
    what: &str,
    declared: u32,
    actual: u64,
    options: &DecodeOptions,
) -> Result<(), FormatError> {
    if u64::from(declared) == actual {
        return Ok(());
    }
    if options.verify_header_counts {
        return Err(FormatError::CountMismatch {
            what: what.to_string(),
            declared: u64::from(declared),
            actual,
        });
    }
    warn!(what, declared, actual, "header count does not match document");
    Ok(())
}

struct Decoder<'a> {
    reader: ByteReader<'a>,
    document: Document,
    /// `true` для узлов, которые ещё декодируются.
    open: Vec<bool>,
    max_depth: usize,
    objects: u64,
    values: u64,
}

impl<'a> Decoder<'a> {
    fn new(
        reader: ByteReader<'a>,
        options: &DecodeOptions,
    ) -> Self {
        Self {
            reader,
            document: Document::empty(),
            open: Vec::new(),
            max_depth: options.max_depth,
            objects: 0,
            values: 0,
        }
    }

    fn read_node(
        &mut self,
        depth: usize,
    ) -> Result<NodeId, FormatError> {
        let offset = self.reader.position() as u64;
        if depth >= self.max_depth {
            return Err(FormatError::DepthLimit {
                depth,
                limit: self.max_depth,
                offset: Some(offset),
            });
        }

        let child_count = match self.reader.read_varcount("child count")? {
            VarCount::Reference(index) => return self.resolve_reference(index, offset),
            VarCount::Literal(n) => n,
        };

        let id = self.document.push_node(Node::default());
        self.open.push(true);

        let hash = self.reader.read_u32("node hash")?;
        self.document.node_mut(id).hash = hash;
        let subject = || format!("node 0x{hash:08X}");

        let field_offset = self.reader.position() as u64;
        let field_count = match self.reader.read_varcount("field count") {
            Ok(VarCount::Literal(n)) => n,
            Ok(VarCount::Reference(_)) => {
                return Err(FormatError::ReferenceNotAllowed {
                    what: "field count".to_string(),
                    offset: Some(field_offset),
                    subject: Some(subject()),
                })
            }
            Err(e) => return Err(e.with_subject(subject())),
        };

        for _ in 0..field_count {
            let at = self.reader.position() as u64;
            let (field_hash, bytes) = self.read_field().map_err(|e| e.with_subject(subject()))?;
            trace!(node = hash, field = field_hash, len = bytes.len(), "field");
            if self.document.node(id).field(field_hash).is_some() {
                return Err(FormatError::corrupted(format!(
                    "duplicate field 0x{field_hash:08X}"
                ))
                .with_offset(at)
                .with_subject(subject()));
            }
            self.document.set_field(id, field_hash, bytes);
        }

        // Ёмкость ограничиваем остатком данных: каждый ребёнок занимает хотя бы
        // один байт.
        let capacity = (child_count as usize).min(self.reader.remaining());
        let mut children = Vec::with_capacity(capacity);
        for _ in 0..child_count {
            children.push(self.read_node(depth + 1)?);
        }
        self.document.node_mut(id).children = children;
        self.open[id.index()] = false;

        self.objects += u64::from(child_count);
        self.values += u64::from(field_count);
        Ok(id)
    }

    fn resolve_reference(
        &self,
        index: u32,
        offset: u64,
    ) -> Result<NodeId, FormatError> {
        let slot = index as usize;
        match self.open.get(slot) {
            None => Err(FormatError::DanglingReference {
                index,
                available: self.open.len(),
                offset: Some(offset),
            }),
            Some(true) => Err(FormatError::CyclicReference {
                index,
                offset: Some(offset),
            }),
            Some(false) => {
                trace!(index, "node back-reference");
                Ok(NodeId(slot))
            }
        }
    }

    fn read_field(&mut self) -> Result<(u32, Vec<u8>), FormatError> {
        let hash = self.reader.read_u32("field hash")?;
        let subject = || format!("field 0x{hash:08X}");

        let token_pos = self.reader.position();
        let bytes = match self.reader.read_varcount("field size") {
            Ok(VarCount::Literal(len)) => self
                .reader
                .read_bytes(len as usize, "field value")
                .map_err(|e| e.with_subject(subject()))?
                .to_vec(),
            Ok(VarCount::Reference(distance)) => self
                .read_referenced_value(token_pos, distance)
                .map_err(|e| e.with_subject(subject()))?,
            Err(e) => return Err(e.with_subject(subject())),
        };
        Ok((hash, bytes))
    }

    /// Читает значение, на которое указывает ссылка с расстоянием `distance`
    /// от позиции токена `token_pos`, и возвращает курсор ровно за токен.
    fn read_referenced_value(
        &mut self,
        token_pos: usize,
        distance: u32,
    ) -> Result<Vec<u8>, FormatError> {
        let target = token_pos.checked_sub(distance as usize).ok_or_else(|| {
            FormatError::corrupted(format!(
                "field reference distance {distance} points before the start of data"
            ))
            .with_offset(token_pos as u64)
        })?;

        self.reader.seek(target)?;
        let len = match self.reader.read_varcount("referenced field size")? {
            VarCount::Literal(len) => len,
            VarCount::Reference(_) => {
                return Err(FormatError::NestedReference {
                    offset: Some(target as u64),
                    subject: None,
                })
            }
        };
        let bytes = self
            .reader
            .read_bytes(len as usize, "referenced field value")?
            .to_vec();

        // Возвращаемся к токену и перечитываем его: итоговая позиция та же,
        // что после обычного литерала.
        self.reader.seek(token_pos)?;
        self.reader.read_varcount("field size")?;
        Ok(bytes)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
