//! Decoder for serialized Stacks transactions, as returned by the wallet in
//! `txRaw`.

use serde::Serialize;
use sha2::{Digest, Sha512_256};

use crate::address::{self, PrincipalData, StacksAddress};
use crate::clarity::ClarityValue;
use crate::codec::{CodecError, Reader};
use crate::network::TransactionVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StacksTransaction {
	pub version: TransactionVersion,
	pub chain_id: u32,
	pub auth: Authorization,
	pub anchor_mode: AnchorMode,
	pub post_condition_mode: PostConditionMode,
	pub post_conditions: Vec<PostCondition>,
	pub payload: TxPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Authorization {
	Standard {
		origin: SpendingCondition,
	},
	Sponsored {
		origin: SpendingCondition,
		sponsor: SpendingCondition,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingCondition {
	pub hash_mode: u8,
	#[serde(serialize_with = "as_hex")]
	pub signer: [u8; 20],
	#[serde(serialize_with = "as_string")]
	pub nonce: u64,
	#[serde(serialize_with = "as_string")]
	pub fee: u64,
	pub signature: SpendingSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SpendingSignature {
	#[serde(rename_all = "camelCase")]
	SingleSig {
		key_encoding: u8,
		#[serde(serialize_with = "as_hex")]
		signature: [u8; 65],
	},
	#[serde(rename_all = "camelCase")]
	MultiSig {
		fields: Vec<AuthField>,
		signatures_required: u16,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum AuthField {
	PublicKey(#[serde(serialize_with = "as_hex")] Vec<u8>),
	Signature(#[serde(serialize_with = "as_hex")] Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorMode {
	OnChainOnly,
	OffChainOnly,
	Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PostConditionMode {
	Allow,
	Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PostConditionPrincipal {
	Origin,
	Standard(StacksAddress),
	Contract(StacksAddress, String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
	pub address: StacksAddress,
	pub contract_name: String,
	pub asset_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostCondition {
	#[serde(rename_all = "camelCase")]
	Stx {
		principal: PostConditionPrincipal,
		condition_code: u8,
		#[serde(serialize_with = "as_string")]
		amount: u64,
	},
	#[serde(rename_all = "camelCase")]
	Fungible {
		principal: PostConditionPrincipal,
		asset: AssetInfo,
		condition_code: u8,
		#[serde(serialize_with = "as_string")]
		amount: u64,
	},
	#[serde(rename_all = "camelCase")]
	NonFungible {
		principal: PostConditionPrincipal,
		asset: AssetInfo,
		asset_value: ClarityValue,
		condition_code: u8,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "payloadType", rename_all = "camelCase")]
pub enum TxPayload {
	#[serde(rename_all = "camelCase")]
	TokenTransfer {
		recipient: PrincipalData,
		#[serde(serialize_with = "as_string")]
		amount: u64,
		#[serde(serialize_with = "as_hex")]
		memo: [u8; 34],
	},
	#[serde(rename_all = "camelCase")]
	SmartContract {
		contract_name: String,
		code_body: String,
		clarity_version: Option<u8>,
	},
	#[serde(rename_all = "camelCase")]
	ContractCall {
		contract_address: StacksAddress,
		contract_name: String,
		function_name: String,
		function_args: Vec<ClarityValue>,
	},
	#[serde(rename_all = "camelCase")]
	Coinbase {
		#[serde(serialize_with = "as_hex")]
		coinbase_buffer: [u8; 32],
		recipient: Option<PrincipalData>,
	},
}

impl StacksTransaction {
	/// Decode a transaction from its hex form, with or without a `0x` prefix.
	pub fn from_hex(s: &str) -> Result<Self, CodecError> {
		let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
			.map_err(|e| CodecError::Invalid(format!("transaction hex: {e}")))?;
		Self::from_bytes(&bytes)
	}

	/// Decode a transaction; every byte must be consumed.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
		let mut r = Reader::new(bytes);
		let tx = Self::read(&mut r)?;
		r.finish()?;
		Ok(tx)
	}

	pub fn read(r: &mut Reader<'_>) -> Result<Self, CodecError> {
		let version_byte = r.read_u8()?;
		let version = TransactionVersion::from_byte(version_byte).ok_or(CodecError::UnknownTag {
			kind: "transaction version",
			tag: version_byte,
		})?;
		let chain_id = r.read_u32()?;
		let auth = read_authorization(r)?;

		let anchor_mode = match r.read_u8()? {
			0x01 => AnchorMode::OnChainOnly,
			0x02 => AnchorMode::OffChainOnly,
			0x03 => AnchorMode::Any,
			tag => return Err(CodecError::UnknownTag { kind: "anchor mode", tag }),
		};
		let post_condition_mode = match r.read_u8()? {
			0x01 => PostConditionMode::Allow,
			0x02 => PostConditionMode::Deny,
			tag => return Err(CodecError::UnknownTag { kind: "post-condition mode", tag }),
		};

		let count = r.read_u32()? as usize;
		let mut post_conditions = Vec::with_capacity(count.min(r.remaining()));
		for _ in 0..count {
			post_conditions.push(read_post_condition(r)?);
		}

		let payload = read_payload(r)?;

		Ok(Self {
			version,
			chain_id,
			auth,
			anchor_mode,
			post_condition_mode,
			post_conditions,
			payload,
		})
	}
}

/// Transaction ID of a serialized transaction: SHA-512/256 of its bytes,
/// 0x-prefixed.
pub fn txid(raw: &[u8]) -> String {
	format!("0x{}", hex::encode(Sha512_256::digest(raw)))
}

// -- Authorization --

fn read_authorization(r: &mut Reader<'_>) -> Result<Authorization, CodecError> {
	match r.read_u8()? {
		0x04 => Ok(Authorization::Standard {
			origin: read_spending_condition(r)?,
		}),
		0x05 => Ok(Authorization::Sponsored {
			origin: read_spending_condition(r)?,
			sponsor: read_spending_condition(r)?,
		}),
		tag => Err(CodecError::UnknownTag { kind: "authorization", tag }),
	}
}

fn read_spending_condition(r: &mut Reader<'_>) -> Result<SpendingCondition, CodecError> {
	let hash_mode = r.read_u8()?;
	let signer = r.read_array()?;
	let nonce = r.read_u64()?;
	let fee = r.read_u64()?;

	let signature = match hash_mode {
		// P2PKH, P2WPKH
		0x00 | 0x02 => {
			let key_encoding = r.read_u8()?;
			if key_encoding > 0x01 {
				return Err(CodecError::UnknownTag { kind: "key encoding", tag: key_encoding });
			}
			SpendingSignature::SingleSig {
				key_encoding,
				signature: r.read_array()?,
			}
		}
		// P2SH, P2WSH and their non-sequential variants
		0x01 | 0x03 | 0x05 | 0x07 => {
			let count = r.read_u32()? as usize;
			let mut fields = Vec::with_capacity(count.min(r.remaining()));
			for _ in 0..count {
				let field = match r.read_u8()? {
					0x00 | 0x01 => AuthField::PublicKey(r.read_bytes(33)?.to_vec()),
					0x02 | 0x03 => AuthField::Signature(r.read_bytes(65)?.to_vec()),
					tag => return Err(CodecError::UnknownTag { kind: "auth field", tag }),
				};
				fields.push(field);
			}
			SpendingSignature::MultiSig {
				fields,
				signatures_required: r.read_u16()?,
			}
		}
		tag => return Err(CodecError::UnknownTag { kind: "hash mode", tag }),
	};

	Ok(SpendingCondition {
		hash_mode,
		signer,
		nonce,
		fee,
		signature,
	})
}

// -- Post conditions --

fn read_post_condition(r: &mut Reader<'_>) -> Result<PostCondition, CodecError> {
	let asset_type = r.read_u8()?;
	let principal = match r.read_u8()? {
		0x01 => PostConditionPrincipal::Origin,
		0x02 => PostConditionPrincipal::Standard(StacksAddress::read(r)?),
		0x03 => {
			let addr = StacksAddress::read(r)?;
			PostConditionPrincipal::Contract(addr, address::read_contract_name(r)?)
		}
		tag => return Err(CodecError::UnknownTag { kind: "post-condition principal", tag }),
	};

	match asset_type {
		0x00 => Ok(PostCondition::Stx {
			principal,
			condition_code: r.read_u8()?,
			amount: r.read_u64()?,
		}),
		0x01 => Ok(PostCondition::Fungible {
			principal,
			asset: read_asset_info(r)?,
			condition_code: r.read_u8()?,
			amount: r.read_u64()?,
		}),
		0x02 => Ok(PostCondition::NonFungible {
			principal,
			asset: read_asset_info(r)?,
			asset_value: ClarityValue::read(r)?,
			condition_code: r.read_u8()?,
		}),
		tag => Err(CodecError::UnknownTag { kind: "post-condition asset", tag }),
	}
}

fn read_asset_info(r: &mut Reader<'_>) -> Result<AssetInfo, CodecError> {
	Ok(AssetInfo {
		address: StacksAddress::read(r)?,
		contract_name: address::read_contract_name(r)?,
		asset_name: r.read_short_string("asset name")?,
	})
}

// -- Payloads --

fn read_payload(r: &mut Reader<'_>) -> Result<TxPayload, CodecError> {
	match r.read_u8()? {
		0x00 => {
			let recipient = match ClarityValue::read(r)? {
				ClarityValue::Principal(p) => p,
				_ => return Err(CodecError::Invalid("token transfer recipient".into())),
			};
			Ok(TxPayload::TokenTransfer {
				recipient,
				amount: r.read_u64()?,
				memo: r.read_array()?,
			})
		}
		0x01 => Ok(TxPayload::SmartContract {
			contract_name: address::read_contract_name(r)?,
			code_body: r.read_long_string("code body")?,
			clarity_version: None,
		}),
		0x02 => {
			let contract_address = StacksAddress::read(r)?;
			let contract_name = address::read_contract_name(r)?;
			let function_name = r.read_short_string("function name")?;
			let count = r.read_u32()? as usize;
			let mut function_args = Vec::with_capacity(count.min(r.remaining()));
			for _ in 0..count {
				function_args.push(ClarityValue::read(r)?);
			}
			Ok(TxPayload::ContractCall {
				contract_address,
				contract_name,
				function_name,
				function_args,
			})
		}
		0x04 => Ok(TxPayload::Coinbase {
			coinbase_buffer: r.read_array()?,
			recipient: None,
		}),
		0x05 => {
			let coinbase_buffer = r.read_array()?;
			let recipient = match ClarityValue::read(r)? {
				ClarityValue::Principal(p) => p,
				_ => return Err(CodecError::Invalid("coinbase recipient".into())),
			};
			Ok(TxPayload::Coinbase {
				coinbase_buffer,
				recipient: Some(recipient),
			})
		}
		0x06 => {
			let version = r.read_u8()?;
			Ok(TxPayload::SmartContract {
				contract_name: address::read_contract_name(r)?,
				code_body: r.read_long_string("code body")?,
				clarity_version: Some(version),
			})
		}
		tag => Err(CodecError::UnknownTag { kind: "payload", tag }),
	}
}

fn as_hex<S: serde::Serializer, T: AsRef<[u8]>>(v: &T, s: S) -> Result<S::Ok, S::Error> {
	s.serialize_str(&hex::encode(v))
}

fn as_string<S: serde::Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
	s.collect_str(v)
}


#[cfg(test)]
mod tests {
	use super::*;

	use super::fixtures::{standard_auth, token_transfer as token_transfer_bytes};

	#[test]
	fn decodes_token_transfer() {
		let tx = StacksTransaction::from_bytes(&token_transfer_bytes()).unwrap();
		assert_eq!(tx.version, TransactionVersion::Testnet);
		assert_eq!(tx.chain_id, 0x8000_0000);
		assert_eq!(tx.anchor_mode, AnchorMode::Any);
		assert_eq!(tx.post_condition_mode, PostConditionMode::Deny);
		match &tx.auth {
			Authorization::Standard { origin } => {
				assert_eq!(origin.nonce, 3);
				assert_eq!(origin.fee, 180);
			}
			other => panic!("unexpected auth {other:?}"),
		}
		match &tx.payload {
			TxPayload::TokenTransfer { recipient, amount, .. } => {
				assert_eq!(*amount, 100_000);
				assert_eq!(*recipient, PrincipalData::Standard(StacksAddress::new(26, [0x22; 20])));
			}
			other => panic!("unexpected payload {other:?}"),
		}
	}

	#[test]
	fn hex_prefix_is_optional() {
		let hex = hex::encode(token_transfer_bytes());
		let a = StacksTransaction::from_hex(&hex).unwrap();
		let b = StacksTransaction::from_hex(&format!("0x{hex}")).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn decodes_contract_call_with_post_condition() {
		let mut out = vec![0x00];
		out.extend_from_slice(&1u32.to_be_bytes());
		standard_auth(&mut out);
		out.push(0x01);
		out.push(0x01);
		out.extend_from_slice(&1u32.to_be_bytes());
		// STX post condition on the origin: sent-equal 500
		out.extend_from_slice(&[0x00, 0x01, 0x01]);
		out.extend_from_slice(&500u64.to_be_bytes());
		out.push(0x02);
		out.push(22);
		out.extend_from_slice(&[0u8; 20]);
		out.push(3);
		out.extend_from_slice(b"pox");
		out.push(8);
		out.extend_from_slice(b"stack-it");
		out.extend_from_slice(&1u32.to_be_bytes());
		out.extend(ClarityValue::UInt(7).serialize().unwrap());

		let tx = StacksTransaction::from_bytes(&out).unwrap();
		assert_eq!(tx.post_conditions.len(), 1);
		match &tx.payload {
			TxPayload::ContractCall { contract_name, function_name, function_args, .. } => {
				assert_eq!(contract_name, "pox");
				assert_eq!(function_name, "stack-it");
				assert_eq!(function_args, &vec![ClarityValue::UInt(7)]);
			}
			other => panic!("unexpected payload {other:?}"),
		}
	}

	#[test]
	fn truncated_and_padded_inputs_fail() {
		let bytes = token_transfer_bytes();
		assert!(matches!(
			StacksTransaction::from_bytes(&bytes[..bytes.len() - 1]),
			Err(CodecError::UnexpectedEof(_))
		));

		let mut padded = bytes.clone();
		padded.push(0);
		assert_eq!(StacksTransaction::from_bytes(&padded), Err(CodecError::TrailingBytes(1)));
	}

	#[test]
	fn non_hex_fails() {
		assert!(StacksTransaction::from_hex("0xzz").is_err());
		assert!(StacksTransaction::from_hex("0x0000").is_err());
	}

	#[test]
	fn txid_is_sha512_256() {
		let id = txid(&[]);
		assert_eq!(id, "0xc672b8d1ef56ed28ab87c3622c5114069bdd3ad7b8f9737498d0c01ecef0967a");
	}
}
