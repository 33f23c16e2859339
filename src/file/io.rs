//! Bounds-checked little-endian reading and writing of primitive values.
//!
//! Every multi-byte value inside a PE image, the metadata streams and IL method bodies is stored
//! in little-endian order. The helpers in this module never panic: reads and writes that would
//! run past the buffer return [`crate::Error::OutOfBounds`].
//!
//! The `_at` variants take a cursor and advance it by the size of the value, which is how table
//! rows and headers are decoded field by field. The `_dyn` variants read or write either 2 or 4
//! bytes, depending on whether a heap or table index is "large".

use crate::{Error::OutOfBounds, Result};

/// Primitive types that can be read from and written to a little-endian byte buffer.
pub trait CilIO: Sized + Copy {
    /// Byte array representation of the value
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Build the value from its little-endian representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Produce the little-endian representation of the value
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Read a `T` from the start of `data`.
///
/// ## Arguments
/// * 'data' - The buffer to read from
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a `T` at `offset` and advance the offset by the size of `T`.
///
/// ## Arguments
/// * 'data'    - The buffer to read from
/// * 'offset'  - Cursor into `data`, advanced on success
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed `data`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Read a 4 byte value when `is_large` is set, otherwise a 2 byte value, widened to `u32`.
///
/// ## Arguments
/// * 'data'        - The buffer to read from
/// * 'offset'      - Cursor into `data`, advanced on success
/// * 'is_large'    - Whether the index occupies 4 bytes
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

/// Write `value` at `offset` and advance the offset by the size of `T`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the write would exceed `data`.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let end = offset.checked_add(bytes.len()).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Write `value` as 4 bytes when `is_large` is set, otherwise as 2 bytes.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the write would exceed `data`, or if `value` does not
/// fit into 2 bytes while `is_large` is not set.
pub fn write_le_at_dyn(data: &mut [u8], offset: &mut usize, value: u32, is_large: bool) -> Result<()> {
    if is_large {
        write_le_at(data, offset, value)
    } else {
        let Ok(small) = u16::try_from(value) else {
            return Err(OutOfBounds);
        };
        write_le_at(data, offset, small)
    }
}

/// Append the ECMA-335 compressed encoding (II.23.2) of `value` to `out`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] for values above `0x1FFF_FFFF`, which have no encoding.
pub fn write_compressed_uint(out: &mut Vec<u8>, value: u32) -> Result<()> {
    match value {
        0..=0x7F => out.push(value as u8),
        0x80..=0x3FFF => {
            out.push(0x80 | (value >> 8) as u8);
            out.push(value as u8);
        }
        0x4000..=0x1FFF_FFFF => {
            out.extend_from_slice(&(0xC000_0000 | value).to_be_bytes());
        }
        _ => return Err(OutOfBounds),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_primitives() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(read_le::<i8>(&[0xFF]).unwrap(), -1);
        assert_eq!(read_le::<f32>(&1.5_f32.to_le_bytes()).unwrap(), 1.5);
    }

    #[test]
    fn read_advances_offset() {
        let mut offset = 0;
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0201);
        assert_eq!(offset, 2);
        assert_eq!(read_le_at::<u32>(&TEST_BUFFER, &mut offset).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_dyn() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_out_of_bounds() {
        let mut offset = 6;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(OutOfBounds)
        ));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn write_then_read() {
        let mut buffer = [0_u8; 8];
        let mut offset = 0;
        write_le_at(&mut buffer, &mut offset, 0xBEEF_u16).unwrap();
        write_le_at_dyn(&mut buffer, &mut offset, 0x1234, false).unwrap();
        write_le_at_dyn(&mut buffer, &mut offset, 0xDEAD_0001, true).unwrap();
        assert_eq!(offset, 8);
        assert_eq!(buffer, [0xEF, 0xBE, 0x34, 0x12, 0x01, 0x00, 0xAD, 0xDE]);

        let mut offset = 0;
        assert!(write_le_at_dyn(&mut buffer, &mut offset, 0x1_0000, false).is_err());
        assert!(write_le_at(&mut buffer, &mut 6, 0_u32).is_err());
    }

    #[test]
    fn compressed_uint() {
        let mut out = Vec::new();
        write_compressed_uint(&mut out, 0x03).unwrap();
        write_compressed_uint(&mut out, 0x80).unwrap();
        write_compressed_uint(&mut out, 0x4000).unwrap();
        assert_eq!(out, [0x03, 0x80, 0x80, 0xC0, 0x00, 0x40, 0x00]);
        assert!(write_compressed_uint(&mut out, 0x2000_0000).is_err());
    }
}
