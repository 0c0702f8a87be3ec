//! Low-level wire primitives shared by the document and Rml codecs.

pub mod reader;
pub mod varcount;

pub use reader::ByteReader;
pub use varcount::{decode_varcount, encoded_len, write_varcount, VarCount, MAX_VARCOUNT_LEN};
