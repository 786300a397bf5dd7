//! Clarity values and their consensus serialization.
//!
//! Contract-call arguments travel to the wallet as hex strings of this
//! encoding, and the same encoding appears inside signed transactions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{self, PrincipalData, StacksAddress};
use crate::codec::{self, CodecError, Reader};

/// Maximum nesting of lists, tuples, optionals and responses.
pub const MAX_DEPTH: usize = 32;

const MAX_TUPLE_KEY_LEN: usize = 128;

mod tag {
	pub const INT: u8 = 0x00;
	pub const UINT: u8 = 0x01;
	pub const BUFFER: u8 = 0x02;
	pub const TRUE: u8 = 0x03;
	pub const FALSE: u8 = 0x04;
	pub const STANDARD_PRINCIPAL: u8 = 0x05;
	pub const CONTRACT_PRINCIPAL: u8 = 0x06;
	pub const RESPONSE_OK: u8 = 0x07;
	pub const RESPONSE_ERR: u8 = 0x08;
	pub const NONE: u8 = 0x09;
	pub const SOME: u8 = 0x0a;
	pub const LIST: u8 = 0x0b;
	pub const TUPLE: u8 = 0x0c;
	pub const STRING_ASCII: u8 = 0x0d;
	pub const STRING_UTF8: u8 = 0x0e;
}

/// A structured Clarity value.
///
/// The JSON form is `{"type": "<kind>", "value": ...}`; 128-bit integers are
/// written as decimal strings and buffers as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ClarityValue {
	Int(#[serde(with = "dec_string")] i128),
	#[serde(rename = "uint")]
	UInt(#[serde(with = "dec_string")] u128),
	Buffer(#[serde(with = "hex_string")] Vec<u8>),
	Bool(bool),
	Principal(PrincipalData),
	ResponseOk(Box<ClarityValue>),
	ResponseErr(Box<ClarityValue>),
	None,
	Some(Box<ClarityValue>),
	List(Vec<ClarityValue>),
	Tuple(BTreeMap<String, ClarityValue>),
	StringAscii(String),
	StringUtf8(String),
}

impl ClarityValue {
	/// Consensus-serialize the value.
	pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
		let mut out = Vec::new();
		self.write(&mut out, 0)?;
		Ok(out)
	}

	pub fn to_hex(&self) -> Result<String, CodecError> {
		Ok(hex::encode(self.serialize()?))
	}

	/// Decode a single value that must span the whole input.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
		let mut r = Reader::new(bytes);
		let value = Self::read(&mut r)?;
		r.finish()?;
		Ok(value)
	}

	pub fn read(r: &mut Reader<'_>) -> Result<Self, CodecError> {
		Self::read_at(r, 0)
	}

	fn write(&self, out: &mut Vec<u8>, depth: usize) -> Result<(), CodecError> {
		if depth > MAX_DEPTH {
			return Err(CodecError::TooDeep(MAX_DEPTH));
		}

		match self {
			Self::Int(v) => {
				out.push(tag::INT);
				out.extend_from_slice(&v.to_be_bytes());
			}
			Self::UInt(v) => {
				out.push(tag::UINT);
				out.extend_from_slice(&v.to_be_bytes());
			}
			Self::Buffer(bytes) => {
				out.push(tag::BUFFER);
				codec::write_len_u32(out, bytes.len(), "buffer")?;
				out.extend_from_slice(bytes);
			}
			Self::Bool(true) => out.push(tag::TRUE),
			Self::Bool(false) => out.push(tag::FALSE),
			Self::Principal(PrincipalData::Standard(addr)) => {
				out.push(tag::STANDARD_PRINCIPAL);
				addr.write(out);
			}
			Self::Principal(PrincipalData::Contract(addr, name)) => {
				out.push(tag::CONTRACT_PRINCIPAL);
				addr.write(out);
				address::write_contract_name(out, name)?;
			}
			Self::ResponseOk(inner) => {
				out.push(tag::RESPONSE_OK);
				inner.write(out, depth + 1)?;
			}
			Self::ResponseErr(inner) => {
				out.push(tag::RESPONSE_ERR);
				inner.write(out, depth + 1)?;
			}
			Self::None => out.push(tag::NONE),
			Self::Some(inner) => {
				out.push(tag::SOME);
				inner.write(out, depth + 1)?;
			}
			Self::List(items) => {
				out.push(tag::LIST);
				codec::write_len_u32(out, items.len(), "list")?;
				for item in items {
					item.write(out, depth + 1)?;
				}
			}
			Self::Tuple(fields) => {
				out.push(tag::TUPLE);
				codec::write_len_u32(out, fields.len(), "tuple")?;
				// BTreeMap iterates in byte order, which is the canonical field order.
				for (key, value) in fields {
					validate_tuple_key(key)?;
					codec::write_short_string(out, key, MAX_TUPLE_KEY_LEN, "tuple key")?;
					value.write(out, depth + 1)?;
				}
			}
			Self::StringAscii(s) => {
				if !s.bytes().all(|b| b.is_ascii_graphic() || b == b' ' || b"\n\r\t".contains(&b)) {
					return Err(CodecError::Invalid(format!("ascii string {s:?}")));
				}
				out.push(tag::STRING_ASCII);
				codec::write_len_u32(out, s.len(), "ascii string")?;
				out.extend_from_slice(s.as_bytes());
			}
			Self::StringUtf8(s) => {
				out.push(tag::STRING_UTF8);
				codec::write_len_u32(out, s.len(), "utf8 string")?;
				out.extend_from_slice(s.as_bytes());
			}
		}
		Ok(())
	}

	fn read_at(r: &mut Reader<'_>, depth: usize) -> Result<Self, CodecError> {
		if depth > MAX_DEPTH {
			return Err(CodecError::TooDeep(MAX_DEPTH));
		}

		let value = match r.read_u8()? {
			tag::INT => Self::Int(i128::from_be_bytes(r.read_array()?)),
			tag::UINT => Self::UInt(u128::from_be_bytes(r.read_array()?)),
			tag::BUFFER => {
				let len = r.read_u32()? as usize;
				Self::Buffer(r.read_bytes(len)?.to_vec())
			}
			tag::TRUE => Self::Bool(true),
			tag::FALSE => Self::Bool(false),
			tag::STANDARD_PRINCIPAL => Self::Principal(PrincipalData::Standard(StacksAddress::read(r)?)),
			tag::CONTRACT_PRINCIPAL => {
				let addr = StacksAddress::read(r)?;
				let name = address::read_contract_name(r)?;
				Self::Principal(PrincipalData::Contract(addr, name))
			}
			tag::RESPONSE_OK => Self::ResponseOk(Box::new(Self::read_at(r, depth + 1)?)),
			tag::RESPONSE_ERR => Self::ResponseErr(Box::new(Self::read_at(r, depth + 1)?)),
			tag::NONE => Self::None,
			tag::SOME => Self::Some(Box::new(Self::read_at(r, depth + 1)?)),
			tag::LIST => {
				let len = r.read_u32()? as usize;
				let mut items = Vec::with_capacity(len.min(r.remaining()));
				for _ in 0..len {
					items.push(Self::read_at(r, depth + 1)?);
				}
				Self::List(items)
			}
			tag::TUPLE => {
				let len = r.read_u32()? as usize;
				let mut fields = BTreeMap::new();
				for _ in 0..len {
					let key = r.read_short_string("tuple key")?;
					validate_tuple_key(&key)?;
					let value = Self::read_at(r, depth + 1)?;
					if fields.insert(key.clone(), value).is_some() {
						return Err(CodecError::Invalid(format!("duplicate tuple key {key:?}")));
					}
				}
				Self::Tuple(fields)
			}
			tag::STRING_ASCII => Self::StringAscii(r.read_long_string("ascii string")?),
			tag::STRING_UTF8 => Self::StringUtf8(r.read_long_string("utf8 string")?),
			other => return Err(CodecError::UnknownTag { kind: "clarity value", tag: other }),
		};
		Ok(value)
	}
}

fn validate_tuple_key(key: &str) -> Result<(), CodecError> {
	let ok = !key.is_empty()
		&& key.len() <= MAX_TUPLE_KEY_LEN
		&& key.chars().all(|c| c.is_ascii_alphanumeric() || "-_!?+<>=/*".contains(c));
	if ok {
		Ok(())
	} else {
		Err(CodecError::Invalid(format!("tuple key {key:?}")))
	}
}

mod dec_string {
	use std::fmt::Display;
	use std::str::FromStr;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<T: Display, S: Serializer>(v: &T, s: S) -> Result<S::Ok, S::Error> {
		s.collect_str(v)
	}

	pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
	where
		T: FromStr,
		T::Err: Display,
		D: Deserializer<'de>,
	{
		String::deserialize(d)?.parse().map_err(serde::de::Error::custom)
	}
}

mod hex_string {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
		s.serialize_str(&hex::encode(v))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(d)?;
		hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uint_layout() {
		let hex = ClarityValue::UInt(100).to_hex().unwrap();
		assert_eq!(hex, "0100000000000000000000000000000064");
	}

	#[test]
	fn negative_int_layout() {
		let bytes = ClarityValue::Int(-1).serialize().unwrap();
		assert_eq!(bytes[0], 0x00);
		assert!(bytes[1..].iter().all(|&b| b == 0xff));
	}

	#[test]
	fn tuple_fields_are_sorted() {
		let mut fields = BTreeMap::new();
		fields.insert("b".to_owned(), ClarityValue::Bool(true));
		fields.insert("a".to_owned(), ClarityValue::Bool(false));
		let bytes = ClarityValue::Tuple(fields).serialize().unwrap();
		assert_eq!(bytes, vec![0x0c, 0, 0, 0, 2, 1, b'a', 0x04, 1, b'b', 0x03]);
	}

	#[test]
	fn nested_value_decodes() {
		let value = ClarityValue::ResponseOk(Box::new(ClarityValue::List(vec![
			ClarityValue::Some(Box::new(ClarityValue::StringAscii("hi".into()))),
			ClarityValue::None,
			ClarityValue::Buffer(vec![0xde, 0xad]),
			ClarityValue::Principal("SP000000000000000000002Q6VF78.pox".parse().unwrap()),
		])));
		let bytes = value.serialize().unwrap();
		assert_eq!(ClarityValue::from_bytes(&bytes).unwrap(), value);
	}

	#[test]
	fn non_ascii_string_fails_to_serialize() {
		let err = ClarityValue::StringAscii("héllo".into()).serialize().unwrap_err();
		assert!(matches!(err, CodecError::Invalid(_)));
		assert!(ClarityValue::StringUtf8("héllo".into()).serialize().is_ok());
	}

	#[test]
	fn bad_tuple_key_fails_to_serialize() {
		let mut fields = BTreeMap::new();
		fields.insert("has space".to_owned(), ClarityValue::None);
		assert!(ClarityValue::Tuple(fields).serialize().is_err());
	}

	#[test]
	fn excessive_nesting_is_rejected() {
		let mut value = ClarityValue::None;
		for _ in 0..=MAX_DEPTH + 1 {
			value = ClarityValue::Some(Box::new(value));
		}
		assert_eq!(value.serialize(), Err(CodecError::TooDeep(MAX_DEPTH)));
	}

	#[test]
	fn unknown_tag_is_rejected() {
		assert_eq!(
			ClarityValue::from_bytes(&[0x42]),
			Err(CodecError::UnknownTag { kind: "clarity value", tag: 0x42 })
		);
	}

	#[test]
	fn json_form() {
		let v: ClarityValue =
			serde_json::from_str(r#"{"type":"uint","value":"340282366920938463463374607431768211455"}"#)
				.unwrap();
		assert_eq!(v, ClarityValue::UInt(u128::MAX));

		let v: ClarityValue = serde_json::from_str(r#"{"type":"buffer","value":"0xbeef"}"#).unwrap();
		assert_eq!(v, ClarityValue::Buffer(vec![0xbe, 0xef]));

		let v: ClarityValue = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
		assert_eq!(v, ClarityValue::None);

		let v: ClarityValue = serde_json::from_str(
			r#"{"type":"tuple","value":{"amount":{"type":"int","value":"-5"}}}"#,
		)
		.unwrap();
		assert_eq!(
			v,
			ClarityValue::Tuple(BTreeMap::from([("amount".to_owned(), ClarityValue::Int(-5))]))
		);
	}
}
