use thiserror::Error;

/// Errors raised while reading or writing Stacks wire data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
	#[error("unexpected end of input at offset {0}")]
	UnexpectedEof(usize),

	#[error("unknown {kind} tag 0x{tag:02x}")]
	UnknownTag { kind: &'static str, tag: u8 },

	#[error("invalid {0}")]
	Invalid(String),

	#[error("{0} trailing byte(s) after value")]
	TrailingBytes(usize),

	#[error("value nesting exceeds depth {0}")]
	TooDeep(usize),
}

/// Forward-only cursor over a byte slice.  All integers are big-endian,
/// matching the consensus serialization.
pub struct Reader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	pub fn position(&self) -> usize {
		self.pos
	}

	pub fn remaining(&self) -> usize {
		self.buf.len() - self.pos
	}

	pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
		if self.remaining() < n {
			return Err(CodecError::UnexpectedEof(self.pos));
		}
		let out = &self.buf[self.pos..self.pos + n];
		self.pos += n;
		Ok(out)
	}

	pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.read_bytes(N)?);
		Ok(out)
	}

	pub fn read_u8(&mut self) -> Result<u8, CodecError> {
		Ok(self.read_array::<1>()?[0])
	}

	pub fn read_u16(&mut self) -> Result<u16, CodecError> {
		Ok(u16::from_be_bytes(self.read_array()?))
	}

	pub fn read_u32(&mut self) -> Result<u32, CodecError> {
		Ok(u32::from_be_bytes(self.read_array()?))
	}

	pub fn read_u64(&mut self) -> Result<u64, CodecError> {
		Ok(u64::from_be_bytes(self.read_array()?))
	}

	/// Read a string prefixed by a single length byte (contract names,
	/// function names, asset names, tuple keys).
	pub fn read_short_string(&mut self, what: &str) -> Result<String, CodecError> {
		let len = self.read_u8()? as usize;
		let bytes = self.read_bytes(len)?;
		String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Invalid(format!("{what} encoding")))
	}

	/// Read a string prefixed by a 4-byte length.
	pub fn read_long_string(&mut self, what: &str) -> Result<String, CodecError> {
		let len = self.read_u32()? as usize;
		let bytes = self.read_bytes(len)?;
		String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Invalid(format!("{what} encoding")))
	}

	/// Fail unless every byte has been consumed.
	pub fn finish(&self) -> Result<(), CodecError> {
		match self.remaining() {
			0 => Ok(()),
			n => Err(CodecError::TrailingBytes(n)),
		}
	}
}

/// Append a string with a single length byte, rejecting anything longer
/// than `max` bytes.
pub fn write_short_string(out: &mut Vec<u8>, s: &str, max: usize, what: &str) -> Result<(), CodecError> {
	if s.len() > max {
		return Err(CodecError::Invalid(format!("{what} longer than {max} bytes")));
	}
	out.push(s.len() as u8);
	out.extend_from_slice(s.as_bytes());
	Ok(())
}

/// Append a 4-byte length prefix, failing if `len` does not fit.
pub fn write_len_u32(out: &mut Vec<u8>, len: usize, what: &str) -> Result<(), CodecError> {
	let len = u32::try_from(len).map_err(|_| CodecError::Invalid(format!("{what} length")))?;
	out.extend_from_slice(&len.to_be_bytes());
	Ok(())
}
