//! Кодирование документа.
//!
//! Энкодер всегда пишет литеральные токены: общие узлы и одинаковые значения
//! полей записываются повторно, обратные ссылки не порождаются.

use std::io::Write;

use binobj_error::{BinobjResult, GenericError, ResultExt, StatusCode};
use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use super::{
    header::DocumentHeader,
    node::{Document, NodeId},
};
use crate::wire::write_varcount;

/// Кодирует документ вместе с заголовком в новый буфер.
pub fn encode_document(document: &Document) -> BinobjResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_document(&mut buf, document)?;
    Ok(buf)
}

/// Пишет заголовок и дерево узлов.
pub fn write_document<W: Write>(
    w: &mut W,
    document: &Document,
) -> BinobjResult<()> {
    let (objects, values) = document.total_counts();
    let header = DocumentHeader::new(
        to_u32(objects, "total object count")?,
        to_u32(values, "total value count")?,
    );
    header.write(w)?;
    let written = write_node(w, document, document.root())?;
    debug!(objects, values, bytes = written, "encoded document");
    Ok(())
}

/// Пишет узел и его поддерево, возвращает число записанных байт.
pub fn write_node<W: Write>(
    w: &mut W,
    document: &Document,
    id: NodeId,
) -> BinobjResult<usize> {
    let node = document.get(id).ok_or_else(|| {
        GenericError::new(
            StatusCode::InvalidArgs,
            format!("node {id} does not belong to this document"),
        )
    })?;

    let mut written = write_varcount(w, to_u32(node.children.len() as u64, "child count")?)?;
    w.write_u32::<LittleEndian>(node.hash)
        .context("Failed to write node hash")?;
    written += 4;
    written += write_varcount(w, to_u32(node.fields.len() as u64, "field count")?)?;

    for (&hash, bytes) in &node.fields {
        w.write_u32::<LittleEndian>(hash)
            .context("Failed to write field hash")?;
        written += 4;
        written += write_varcount(w, to_u32(bytes.len() as u64, "field size")?)?;
        w.write_all(bytes)
            .with_context(|| format!("Failed to write field 0x{hash:08X}"))?;
        written += bytes.len();
    }

    for &child in &node.children {
        written += write_node(w, document, child)?;
    }
    Ok(written)
}

fn to_u32(
    value: u64,
    what: &str,
) -> Result<u32, GenericError> {
    u32::try_from(value).map_err(|_| {
        GenericError::new(
            StatusCode::SizeLimit,
            format!("{what} {value} does not fit in 32 bits"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::read_document;

    #[test]
    fn test_node_layout() {
        let mut doc = Document::new(0x0102_0304);
        let root = doc.root();
        doc.set_field(root, 0xAA, vec![9, 8]);
        doc.add_child(root, 5);

        let mut buf = Vec::new();
        let written = write_node(&mut buf, &doc, root).unwrap();
        assert_eq!(written, buf.len());
        assert_eq!(
            buf,
            vec![
                1, // child count
                4, 3, 2, 1, // hash
                1, // field count
                0xAA, 0, 0, 0, 2, 9, 8, // field
                0, 5, 0, 0, 0, 0, // child
            ]
        );
    }

    #[test]
    fn test_long_field_uses_wide_token() {
        let mut doc = Document::new(1);
        doc.set_field(doc.root(), 2, vec![0x55; 300]);
        let mut buf = Vec::new();
        write_node(&mut buf, &doc, doc.root()).unwrap();
        // child, hash, field count, field hash, затем 0xFF + u32.
        assert_eq!(buf[10], 0xFF);
        assert_eq!(&buf[11..15], &300u32.to_le_bytes());
    }

    #[test]
    fn test_header_counts_from_expanded_tree() {
        let mut doc = Document::new(1);
        let root = doc.root();
        let shared = doc.add_child(root, 2);
        doc.set_field(shared, 3, vec![1]);
        doc.link_child(root, shared).unwrap();

        let bytes = encode_document(&doc).unwrap();
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &2u32.to_le_bytes());

        // Общий узел раскрыт в две независимые копии.
        let decoded = read_document(&bytes).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded, doc);
    }
}
