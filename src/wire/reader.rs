use binobj_error::FormatError;
use byteorder::{ByteOrder, LittleEndian};

use super::varcount::{decode_varcount, VarCount, MAX_VARCOUNT_LEN};

/// Курсор по полностью буферизованному документу.
///
/// Все чтения проверяют границы заранее и возвращают [`FormatError`] со
/// смещением начала неудачного чтения.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Перемещает курсор. Позиция, равная длине данных, допустима.
    pub fn seek(
        &mut self,
        pos: usize,
    ) -> Result<(), FormatError> {
        if pos > self.data.len() {
            return Err(FormatError::unexpected_eof(
                "seek target",
                pos as u64,
                self.data.len() as u64,
            )
            .with_offset(self.pos as u64));
        }
        self.pos = pos;
        Ok(())
    }

    fn require(
        &self,
        n: usize,
        what: &str,
    ) -> Result<(), FormatError> {
        if self.remaining() < n {
            return Err(
                FormatError::unexpected_eof(what, n as u64, self.remaining() as u64)
                    .with_offset(self.pos as u64),
            );
        }
        Ok(())
    }

    pub fn read_u8(
        &mut self,
        what: &str,
    ) -> Result<u8, FormatError> {
        self.require(1, what)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16(
        &mut self,
        what: &str,
    ) -> Result<u16, FormatError> {
        let bytes = self.read_bytes(2, what)?;
        Ok(LittleEndian::read_u16(bytes))
    }

    pub fn read_u32(
        &mut self,
        what: &str,
    ) -> Result<u32, FormatError> {
        let bytes = self.read_bytes(4, what)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    /// Возвращает срез длиной `n` без копирования.
    pub fn read_bytes(
        &mut self,
        n: usize,
        what: &str,
    ) -> Result<&'a [u8], FormatError> {
        self.require(n, what)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_varcount(
        &mut self,
        what: &str,
    ) -> Result<VarCount, FormatError> {
        match decode_varcount(&self.data[self.pos..]) {
            Some((token, used)) => {
                self.pos += used;
                Ok(token)
            }
            None => {
                let needed = if self.remaining() == 0 {
                    1
                } else {
                    MAX_VARCOUNT_LEN
                };
                Err(
                    FormatError::unexpected_eof(what, needed as u64, self.remaining() as u64)
                        .with_offset(self.pos as u64),
                )
            }
        }
    }
}
