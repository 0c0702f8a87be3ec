use std::io::Write;

use binobj_error::{BinobjResult, FormatError, ResultExt};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::wire::ByteReader;

/// Magic number документа: байты `nbCF` в файле.
pub const FILE_MAGIC: u32 = 0x4643_626E;
/// Единственная поддерживаемая версия формата.
pub const FORMAT_VERSION: u16 = 3;
/// Флаг отладочной сборки документа; такие документы не поддерживаются.
pub const FLAG_DEBUG: u16 = 0x0001;
/// Размер заголовка в байтах.
pub const HEADER_LEN: usize = 16;

/// Заголовок документа.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentHeader {
    pub version: u16,
    pub flags: u16,
    /// Сумма кол-ва детей по всем узлам.
    pub total_object_count: u32,
    /// Сумма кол-ва полей по всем узлам.
    pub total_value_count: u32,
}

impl DocumentHeader {
    pub fn new(
        total_object_count: u32,
        total_value_count: u32,
    ) -> Self {
        Self {
            version: FORMAT_VERSION,
            flags: 0,
            total_object_count,
            total_value_count,
        }
    }

    /// Читает и проверяет magic, версию и флаги.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let magic = reader.read_u32("file magic")?;
        if magic != FILE_MAGIC {
            return Err(FormatError::InvalidMagic {
                expected: FILE_MAGIC,
                got: magic,
            });
        }

        let version = reader.read_u16("format version")?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let flags = reader.read_u16("header flags")?;
        if flags != 0 {
            return Err(FormatError::UnsupportedFlags { flags });
        }

        Ok(Self {
            version,
            flags,
            total_object_count: reader.read_u32("total object count")?,
            total_value_count: reader.read_u32("total value count")?,
        })
    }

    pub fn write<W: Write>(
        &self,
        w: &mut W,
    ) -> BinobjResult<()> {
        w.write_u32::<LittleEndian>(FILE_MAGIC)
            .context("Failed to write file magic")?;
        w.write_u16::<LittleEndian>(self.version)
            .context("Failed to write format version")?;
        w.write_u16::<LittleEndian>(self.flags)
            .context("Failed to write header flags")?;
        w.write_u32::<LittleEndian>(self.total_object_count)
            .context("Failed to write object count")?;
        w.write_u32::<LittleEndian>(self.total_value_count)
            .context("Failed to write value count")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(
        magic: u32,
        version: u16,
        flags: u16,
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&magic.to_le_bytes());
        buf.extend_from_slice(&version.to_le_bytes());
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&9u32.to_le_bytes());
        buf
    }

    #[test]
    fn test_write_then_read() {
        let mut buf = Vec::new();
        DocumentHeader::new(7, 9).write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(&buf[..4], b"nbCF");

        let header = DocumentHeader::read(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(header, DocumentHeader::new(7, 9));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let buf = header_bytes(0xDEAD_BEEF, FORMAT_VERSION, 0);
        let err = DocumentHeader::read(&mut ByteReader::new(&buf)).unwrap_err();
        assert!(matches!(err, FormatError::InvalidMagic { got: 0xDEAD_BEEF, .. }));
    }

    #[test]
    fn test_rejects_other_versions() {
        let buf = header_bytes(FILE_MAGIC, 2, 0);
        let err = DocumentHeader::read(&mut ByteReader::new(&buf)).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn test_rejects_debug_flag() {
        let buf = header_bytes(FILE_MAGIC, FORMAT_VERSION, FLAG_DEBUG);
        let err = DocumentHeader::read(&mut ByteReader::new(&buf)).unwrap_err();
        assert_eq!(err, FormatError::UnsupportedFlags { flags: FLAG_DEBUG });
    }

    #[test]
    fn test_truncated_header() {
        let buf = header_bytes(FILE_MAGIC, FORMAT_VERSION, 0);
        let err = DocumentHeader::read(&mut ByteReader::new(&buf[..10])).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }
}
