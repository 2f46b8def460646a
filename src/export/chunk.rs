//! Tagged chunk encoding
//!
//! Layout: 4-byte ASCII tag, `u32` little-endian payload length in bytes, then
//! the records as raw `Pod` bytes.

use std::io::{Read, Write};

use bytemuck::Pod;

use crate::core::error::Error;
use crate::core::types::Result;

/// Four-character chunk tag
pub type Tag = [u8; 4];

fn tag_str(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// Write one chunk of records
pub fn write_chunk<W: Write, T: Pod>(writer: &mut W, tag: &Tag, records: &[T]) -> Result<()> {
    let bytes: &[u8] = bytemuck::cast_slice(records);
    let len = u32::try_from(bytes.len()).map_err(|_| Error::ChunkLength {
        tag: tag_str(tag),
        len: bytes.len(),
        record_size: std::mem::size_of::<T>(),
    })?;

    writer.write_all(tag)?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Read the next chunk, which must carry `tag`
pub fn read_chunk<R: Read, T: Pod>(reader: &mut R, tag: &Tag) -> Result<Vec<T>> {
    let mut found: Tag = [0; 4];
    reader.read_exact(&mut found)?;
    if &found != tag {
        return Err(Error::ChunkTag {
            expected: tag_str(tag),
            found: tag_str(&found),
        });
    }

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let record_size = std::mem::size_of::<T>();
    if record_size == 0 || len % record_size != 0 {
        return Err(Error::ChunkLength {
            tag: tag_str(tag),
            len,
            record_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    // Payload has byte alignment only
    Ok(payload
        .chunks_exact(record_size)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

/// Pack names as consecutive NUL-terminated strings
pub fn encode_names<S: AsRef<str>>(names: &[S]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for name in names {
        bytes.extend_from_slice(name.as_ref().as_bytes());
        bytes.push(0);
    }
    bytes
}

/// Inverse of `encode_names`
pub fn decode_names(bytes: &[u8]) -> Vec<String> {
    let Some(body) = bytes.strip_suffix(&[0]) else {
        return if bytes.is_empty() {
            Vec::new()
        } else {
            vec![String::from_utf8_lossy(bytes).into_owned()]
        };
    };
    body.split(|b| *b == 0)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_chunk_layout() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, b"nums", &[7u32]).unwrap();
        assert_eq!(&bytes[0..4], b"nums");
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_read_back_consecutive_chunks() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, b"aaaa", &[[1.0f32, 2.0, 3.0]]).unwrap();
        write_chunk(&mut bytes, b"bbbb", &[-1i32, 4]).unwrap();

        let mut cursor = Cursor::new(bytes);
        let a: Vec<[f32; 3]> = read_chunk(&mut cursor, b"aaaa").unwrap();
        let b: Vec<i32> = read_chunk(&mut cursor, b"bbbb").unwrap();
        assert_eq!(a, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(b, vec![-1, 4]);
    }

    #[test]
    fn test_wrong_tag() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, b"vert", &[0u32]).unwrap();
        let result: Result<Vec<u32>> = read_chunk(&mut Cursor::new(bytes), b"norm");
        assert!(matches!(result, Err(Error::ChunkTag { .. })));
    }

    #[test]
    fn test_length_not_multiple_of_record() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, b"keys", &[0u8; 6]).unwrap();
        let result: Result<Vec<u32>> = read_chunk(&mut Cursor::new(bytes), b"keys");
        assert!(matches!(result, Err(Error::ChunkLength { len: 6, record_size: 4, .. })));
    }

    #[test]
    fn test_truncated_payload_is_io_error() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, b"keys", &[1u32, 2, 3]).unwrap();
        bytes.truncate(bytes.len() - 2);
        let result: Result<Vec<u32>> = read_chunk(&mut Cursor::new(bytes), b"keys");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_names() {
        let encoded = encode_names(&["root", "", "arm"]);
        assert_eq!(encoded, b"root\0\0arm\0");
        assert_eq!(decode_names(&encoded), vec!["root", "", "arm"]);
        assert!(decode_names(&[]).is_empty());
    }
}
