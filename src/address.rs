use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::codec::{self, CodecError, Reader};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

pub const MAINNET_SINGLE_SIG: u8 = 22;
pub const MAINNET_MULTI_SIG: u8 = 20;
pub const TESTNET_SINGLE_SIG: u8 = 26;
pub const TESTNET_MULTI_SIG: u8 = 21;

/// Longest contract name the consensus rules accept.
pub const MAX_CONTRACT_NAME_LEN: usize = 128;

/// A Stacks account address: version byte plus HASH160 of the key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StacksAddress {
	pub version: u8,
	pub hash160: [u8; 20],
}

impl StacksAddress {
	pub fn new(version: u8, hash160: [u8; 20]) -> Self {
		Self { version, hash160 }
	}

	pub fn read(r: &mut Reader<'_>) -> Result<Self, CodecError> {
		let version = r.read_u8()?;
		let hash160 = r.read_array()?;
		Ok(Self { version, hash160 })
	}

	pub fn write(&self, out: &mut Vec<u8>) {
		out.push(self.version);
		out.extend_from_slice(&self.hash160);
	}
}

impl fmt::Display for StacksAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut data = self.hash160.to_vec();
		data.extend_from_slice(&checksum(self.version, &self.hash160));
		write!(f, "S{}{}", C32_ALPHABET[self.version as usize % 32] as char, c32_encode(&data))
	}
}

impl FromStr for StacksAddress {
	type Err = CodecError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || CodecError::Invalid(format!("Stacks address {s:?}"));

		let body = s.strip_prefix('S').ok_or_else(invalid)?;
		let mut chars = body.chars();
		let version = chars.next().and_then(c32_value).ok_or_else(invalid)?;
		let decoded = c32_decode(chars.as_str()).ok_or_else(invalid)?;
		if decoded.len() != 24 {
			return Err(invalid());
		}

		let (hash, sum) = decoded.split_at(20);
		if checksum(version, hash) != sum {
			return Err(CodecError::Invalid(format!("checksum for address {s:?}")));
		}

		let mut hash160 = [0u8; 20];
		hash160.copy_from_slice(hash);
		Ok(Self { version, hash160 })
	}
}

impl Serialize for StacksAddress {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for StacksAddress {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// A principal as it appears in Clarity values and post conditions:
/// either a plain account or a contract deployed by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrincipalData {
	Standard(StacksAddress),
	Contract(StacksAddress, String),
}

impl fmt::Display for PrincipalData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Standard(addr) => write!(f, "{addr}"),
			Self::Contract(addr, name) => write!(f, "{addr}.{name}"),
		}
	}
}

impl FromStr for PrincipalData {
	type Err = CodecError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.split_once('.') {
			Some((addr, name)) => {
				validate_contract_name(name)?;
				Ok(Self::Contract(addr.parse()?, name.to_owned()))
			}
			None => Ok(Self::Standard(s.parse()?)),
		}
	}
}

impl Serialize for PrincipalData {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for PrincipalData {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Contract names start with a letter and continue with letters, digits,
/// `-` or `_`.
pub fn validate_contract_name(name: &str) -> Result<(), CodecError> {
	let mut chars = name.chars();
	let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
	let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
	if !first_ok || !rest_ok || name.len() > MAX_CONTRACT_NAME_LEN {
		return Err(CodecError::Invalid(format!("contract name {name:?}")));
	}
	Ok(())
}

/// Read a length-prefixed contract name and validate it.
pub fn read_contract_name(r: &mut Reader<'_>) -> Result<String, CodecError> {
	let name = r.read_short_string("contract name")?;
	validate_contract_name(&name)?;
	Ok(name)
}

pub fn write_contract_name(out: &mut Vec<u8>, name: &str) -> Result<(), CodecError> {
	validate_contract_name(name)?;
	codec::write_short_string(out, name, MAX_CONTRACT_NAME_LEN, "contract name")
}

// -- c32check --

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
	let mut h = Sha256::new();
	h.update([version]);
	h.update(data);
	let twice = Sha256::digest(h.finalize());
	let mut out = [0u8; 4];
	out.copy_from_slice(&twice[..4]);
	out
}

fn c32_value(c: char) -> Option<u8> {
	let c = match c.to_ascii_uppercase() {
		'O' => '0',
		'L' | 'I' => '1',
		other => other,
	};
	C32_ALPHABET.iter().position(|&a| a as char == c).map(|i| i as u8)
}

/// Base-32 encode preserving one leading `0` per leading zero byte.
fn c32_encode(input: &[u8]) -> String {
	let mut out: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
	let mut carry: u8 = 0;
	let mut carry_bits: u8 = 0;

	for &byte in input.iter().rev() {
		let take = 5 - carry_bits;
		let low = byte & ((1 << take) - 1);
		out.push(C32_ALPHABET[((low << carry_bits) + carry) as usize]);
		carry_bits = 8 + carry_bits - 5;
		carry = byte >> (8 - carry_bits);
		if carry_bits >= 5 {
			out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
			carry_bits -= 5;
			carry >>= 5;
		}
	}
	if carry_bits > 0 {
		out.push(C32_ALPHABET[carry as usize]);
	}

	while out.last() == Some(&C32_ALPHABET[0]) {
		out.pop();
	}
	for _ in input.iter().take_while(|&&b| b == 0) {
		out.push(C32_ALPHABET[0]);
	}

	out.iter().rev().map(|&b| b as char).collect()
}

fn c32_decode(input: &str) -> Option<Vec<u8>> {
	let digits = input.chars().map(c32_value).collect::<Option<Vec<u8>>>()?;

	let mut out = Vec::with_capacity(digits.len() * 5 / 8 + 1);
	let mut carry: u16 = 0;
	let mut carry_bits: u16 = 0;
	for &d in digits.iter().rev() {
		carry += (d as u16) << carry_bits;
		carry_bits += 5;
		if carry_bits >= 8 {
			out.push((carry & 0xff) as u8);
			carry_bits -= 8;
			carry >>= 8;
		}
	}
	if carry_bits > 0 {
		out.push(carry as u8);
	}

	while out.last() == Some(&0) {
		out.pop();
	}
	for _ in digits.iter().take_while(|&&d| d == 0) {
		out.push(0);
	}

	out.reverse();
	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn boot_addresses_encode() {
		let mainnet = StacksAddress::new(MAINNET_SINGLE_SIG, [0u8; 20]);
		let testnet = StacksAddress::new(TESTNET_SINGLE_SIG, [0u8; 20]);
		assert_eq!(mainnet.to_string(), "SP000000000000000000002Q6VF78");
		assert_eq!(testnet.to_string(), "ST000000000000000000002AMW42H");
	}

	#[test]
	fn address_string_roundtrip() {
		let addr = StacksAddress::new(TESTNET_SINGLE_SIG, [0xab; 20]);
		let parsed: StacksAddress = addr.to_string().parse().unwrap();
		assert_eq!(parsed, addr);
	}

	#[test]
	fn checksum_mismatch_is_rejected() {
		let mut s = StacksAddress::new(MAINNET_SINGLE_SIG, [7u8; 20]).to_string();
		let last = s.pop().unwrap();
		s.push(if last == 'X' { 'Y' } else { 'X' });
		assert!(s.parse::<StacksAddress>().is_err());
	}

	#[test]
	fn garbage_is_rejected() {
		assert!("".parse::<StacksAddress>().is_err());
		assert!("SP".parse::<StacksAddress>().is_err());
		assert!("XP000000000000000000002Q6VF78".parse::<StacksAddress>().is_err());
		assert!("SP0000000000000000000U2Q6VF78".parse::<StacksAddress>().is_err());
	}

	#[test]
	fn contract_principal_parses() {
		let p: PrincipalData = "SP000000000000000000002Q6VF78.pox-3".parse().unwrap();
		match &p {
			PrincipalData::Contract(addr, name) => {
				assert_eq!(addr.version, MAINNET_SINGLE_SIG);
				assert_eq!(name, "pox-3");
			}
			other => panic!("expected contract principal, got {other:?}"),
		}
		assert_eq!(p.to_string(), "SP000000000000000000002Q6VF78.pox-3");
	}

	#[test]
	fn contract_names_are_validated() {
		assert!(validate_contract_name("hello-world_2").is_ok());
		assert!(validate_contract_name("").is_err());
		assert!(validate_contract_name("2fast").is_err());
		assert!(validate_contract_name("has space").is_err());
		assert!(validate_contract_name(&"a".repeat(129)).is_err());
	}
}
