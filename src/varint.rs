//! LEB128 varints and zigzag mapping shared by the binary protocols.

use crate::error::{CoreError, Result};
use crate::types::DataType;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Read, Write};

pub(crate) fn write_varint<W: Write>(w: &mut W, mut v: u64) -> Result<()> {
    while v >= 0x80 {
        w.write_u8((v as u8) | 0x80)?;
        v >>= 7;
    }
    w.write_u8(v as u8)?;
    Ok(())
}

pub(crate) fn read_varint<R: Read>(r: &mut R) -> Result<u64> {
    let mut v = 0u64;
    for shift in (0..64).step_by(7) {
        let b = r.read_u8()?;
        v |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(v);
        }
    }
    Err(CoreError::stream("varint longer than 10 bytes"))
}

/// Narrow a decoded varint to the width of wire type `ty`.
pub(crate) fn narrow<T, V>(v: V, ty: DataType) -> Result<T>
where
    T: TryFrom<V>,
    V: Copy + fmt::Display,
{
    T::try_from(v).map_err(|_| CoreError::stream(format!("varint {v} out of range for {ty:?}")))
}

pub(crate) fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

pub(crate) fn unzigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn varint_bytes(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, v).expect("write");
        out
    }

    #[test]
    fn varint_encoding() {
        assert_eq!(varint_bytes(0), [0x00]);
        assert_eq!(varint_bytes(127), [0x7f]);
        assert_eq!(varint_bytes(300), [0xac, 0x02]);
        assert_eq!(varint_bytes(u64::MAX).len(), 10);
        let mut cursor = Cursor::new(&[0xac, 0x02][..]);
        assert_eq!(read_varint(&mut cursor).expect("read"), 300);
    }

    #[test]
    fn varint_overlong_rejected() {
        let bytes = [0xffu8; 11];
        assert!(read_varint(&mut Cursor::new(&bytes[..])).is_err());
    }

    #[test]
    fn zigzag_values() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(unzigzag(zigzag(i64::MIN)), i64::MIN);
        assert_eq!(unzigzag(zigzag(i64::MAX)), i64::MAX);
    }
}
