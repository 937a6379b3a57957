//! SSH wire encoding (RFC 4251 §5): `uint32`, `string` and `mpint`.

use super::SshError;

/// Cursor over an SSH wire-encoded buffer.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SshError> {
        if self.buf.len() < len {
            return Err(SshError::Truncated);
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_u32(&mut self) -> Result<u32, SshError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_string(&mut self) -> Result<&'a [u8], SshError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub fn read_str(&mut self) -> Result<&'a str, SshError> {
        std::str::from_utf8(self.read_string()?)
            .map_err(|_| SshError::Malformed("string is not valid UTF-8".into()))
    }

    /// Read a non-negative `mpint`, returning its magnitude without leading zeros.
    pub fn read_mpint(&mut self) -> Result<&'a [u8], SshError> {
        let raw = self.read_string()?;
        if raw.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(SshError::Malformed("negative mpint".into()));
        }
        let start = raw.iter().position(|&b| b != 0).unwrap_or(raw.len());
        Ok(&raw[start..])
    }

    /// Require that the whole buffer was consumed.
    pub fn finish(self) -> Result<(), SshError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(SshError::Malformed("trailing bytes".into()))
        }
    }
}

pub(crate) fn put_string(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

#[cfg(test)]
pub(crate) fn put_mpint(out: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(magnitude.len());
    let trimmed = &magnitude[start..];
    if trimmed.first().is_some_and(|b| b & 0x80 != 0) {
        let mut padded = Vec::with_capacity(trimmed.len() + 1);
        padded.push(0);
        padded.extend_from_slice(trimmed);
        put_string(out, &padded);
    } else {
        put_string(out, trimmed);
    }
}
