// Little-endian primitives shared by the layer manager and attribute table streams.

use crate::error::{Result, SalaError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

// Guards against reading a corrupt length prefix as a huge allocation.
const MAX_STRING_LEN: u32 = 1 << 20;

pub(crate) fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    let len = u32::try_from(s.len()).map_err(|_| SalaError::Format(format!("string too long: {}", s.len())))?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub(crate) fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > MAX_STRING_LEN {
        return Err(SalaError::Format(format!("string length {} out of range", len)));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| SalaError::Format(e.to_string()))
}

pub(crate) fn write_bool<W: Write>(w: &mut W, b: bool) -> Result<()> {
    w.write_u8(b as u8)?;
    Ok(())
}

pub(crate) fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    match r.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(SalaError::Format(format!("bad flag byte {}", v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_and_flags() {
        let mut buf = Vec::new();
        write_string(&mut buf, "Everything").unwrap();
        write_bool(&mut buf, true).unwrap();
        let mut r = buf.as_slice();
        assert_eq!(read_string(&mut r).unwrap(), "Everything");
        assert!(read_bool(&mut r).unwrap());
        assert!(matches!(read_bool(&mut [7u8].as_slice()), Err(SalaError::Format(_))));
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let mut buf = Vec::new();
        write_string(&mut buf, "abc").unwrap();
        buf.pop();
        assert!(matches!(read_string(&mut buf.as_slice()), Err(SalaError::Io(_))));
    }
}
