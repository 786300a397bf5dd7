use k256::ecdsa::{signature::Signer, signature::Verifier, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::{ConnectError, Result};

// -- Keys --

/// Parse a hex private key.  Stacks keys are 32 bytes, optionally followed
/// by a `01` byte flagging that the public key is used compressed.
pub fn parse_private_key(hex_key: &str) -> Result<SigningKey> {
	let clean = hex_key.strip_prefix("0x").unwrap_or(hex_key);
	let bytes = hex::decode(clean).map_err(|e| ConnectError::Signing(format!("private key is not hex: {e}")))?;

	let raw = match bytes.len() {
		32 => &bytes[..],
		33 if bytes[32] == 0x01 => &bytes[..32],
		n => {
			return Err(ConnectError::Signing(format!(
				"private key must be 32 bytes (or 33 with a 01 suffix), got {n}"
			)))
		}
	};

	SigningKey::from_slice(raw).map_err(|e| ConnectError::Signing(format!("invalid private key: {e}")))
}

/// Compressed SEC1 public key of `key`, hex encoded (66 chars).
pub fn public_key_hex(key: &SigningKey) -> String {
	let point = key.verifying_key().as_affine().to_encoded_point(true);
	hex::encode(point.as_bytes())
}

/// Derive the compressed public key straight from a hex private key.
pub fn derive_public_key(private_key_hex: &str) -> Result<String> {
	Ok(public_key_hex(&parse_private_key(private_key_hex)?))
}

/// Fresh random private key in the compressed-suffix form wallets store.
pub fn generate_private_key() -> String {
	let key = SigningKey::random(&mut rand::rngs::OsRng);
	format!("{}01", hex::encode(key.to_bytes()))
}

// -- Signatures --

/// ES256K signature over `message`: SHA-256 then ECDSA, returned as the
/// 64-byte `r || s` form used by JWS.
pub fn sign_es256k(key: &SigningKey, message: &[u8]) -> [u8; 64] {
	let sig: Signature = key.sign(message);
	let mut out = [0u8; 64];
	out.copy_from_slice(&sig.to_bytes());
	out
}

/// Check an `r || s` signature against a hex SEC1 public key.
pub fn verify_es256k(public_key_hex: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
	let pk_bytes = hex::decode(public_key_hex)
		.map_err(|e| ConnectError::InvalidToken(format!("public key is not hex: {e}")))?;
	let key = VerifyingKey::from_sec1_bytes(&pk_bytes)
		.map_err(|e| ConnectError::InvalidToken(format!("invalid public key: {e}")))?;
	let Ok(sig) = Signature::from_slice(signature) else {
		return Ok(false);
	};
	Ok(key.verify(message, &sig).is_ok())
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0000000000000000000000000000000000000000000000000000000000000001";

	#[test]
	fn generator_point_public_key() {
		// 1 * G, compressed.
		assert_eq!(
			derive_public_key(KEY).unwrap(),
			"0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
		);
	}

	#[test]
	fn compressed_suffix_is_accepted() {
		let with_suffix = format!("{KEY}01");
		assert_eq!(derive_public_key(&with_suffix).unwrap(), derive_public_key(KEY).unwrap());
	}

	#[test]
	fn malformed_keys_are_signing_errors() {
		let wrong_suffix = format!("{KEY}02");
		let zero = "00".repeat(32);
		for bad in ["", "zz", "00", wrong_suffix.as_str(), zero.as_str()] {
			assert!(
				matches!(parse_private_key(bad), Err(ConnectError::Signing(_))),
				"{bad:?} should be rejected"
			);
		}
	}

	#[test]
	fn sign_then_verify() {
		let key = parse_private_key(KEY).unwrap();
		let pk = public_key_hex(&key);
		let sig = sign_es256k(&key, b"hello");
		assert!(verify_es256k(&pk, b"hello", &sig).unwrap());
		assert!(!verify_es256k(&pk, b"hellO", &sig).unwrap());
	}

	#[test]
	fn generated_keys_parse() {
		let k = generate_private_key();
		assert_eq!(k.len(), 66);
		assert!(k.ends_with("01"));
		assert!(parse_private_key(&k).is_ok());
	}
}
