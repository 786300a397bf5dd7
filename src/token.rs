//! Compact ES256K request tokens (`header.payload.signature`, base64url).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use k256::ecdsa::SigningKey;
use serde::Serialize;
use serde_json::Value;

use crate::crypto;
use crate::error::{ConnectError, Result};

const HEADER: &str = r#"{"typ":"JWT","alg":"ES256K"}"#;

/// Signs payloads with an app private key.
pub struct TokenSigner {
	key: SigningKey,
}

impl TokenSigner {
	/// Fails with [`ConnectError::Signing`] if the key is malformed.
	pub fn new(private_key_hex: &str) -> Result<Self> {
		Ok(Self {
			key: crypto::parse_private_key(private_key_hex)?,
		})
	}

	pub fn public_key(&self) -> String {
		crypto::public_key_hex(&self.key)
	}

	/// Serialize `payload` and sign it.
	pub async fn sign<T: Serialize>(&self, payload: &T) -> Result<String> {
		let body = serde_json::to_vec(payload)?;
		let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(HEADER), URL_SAFE_NO_PAD.encode(body));

		// Let other tasks run before the curve arithmetic.
		tokio::task::yield_now().await;
		let signature = crypto::sign_es256k(&self.key, signing_input.as_bytes());

		Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
	}
}

/// The three segments of a token, decoded.
#[derive(Debug, Clone)]
pub struct DecodedToken {
	pub header: Value,
	pub payload: Value,
	pub signature: Vec<u8>,
	signing_input: String,
}

impl DecodedToken {
	/// `publicKey` claim of the payload, if any.
	pub fn public_key(&self) -> Option<&str> {
		self.payload.get("publicKey").and_then(Value::as_str)
	}
}

/// Split and decode a token without checking its signature.
pub fn decode_token(token: &str) -> Result<DecodedToken> {
	let mut parts = token.split('.');
	let (Some(header), Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
	else {
		return Err(ConnectError::InvalidToken("expected three dot-separated segments".into()));
	};

	let decode = |segment: &str, what: &str| {
		URL_SAFE_NO_PAD
			.decode(segment)
			.map_err(|e| ConnectError::InvalidToken(format!("{what} is not base64url: {e}")))
	};

	let header_json: Value = serde_json::from_slice(&decode(header, "header")?)
		.map_err(|e| ConnectError::InvalidToken(format!("header is not JSON: {e}")))?;
	let payload_json: Value = serde_json::from_slice(&decode(payload, "payload")?)
		.map_err(|e| ConnectError::InvalidToken(format!("payload is not JSON: {e}")))?;

	Ok(DecodedToken {
		header: header_json,
		payload: payload_json,
		signature: decode(signature, "signature")?,
		signing_input: format!("{header}.{payload}"),
	})
}

/// Verify a token's signature against the `publicKey` it carries.
pub fn verify_token(token: &str) -> Result<bool> {
	let decoded = decode_token(token)?;
	if decoded.header.get("alg").and_then(Value::as_str) != Some("ES256K") {
		return Err(ConnectError::InvalidToken("unsupported algorithm".into()));
	}
	let public_key = decoded
		.public_key()
		.ok_or_else(|| ConnectError::InvalidToken("payload has no publicKey".into()))?;
	crypto::verify_es256k(public_key, decoded.signing_input.as_bytes(), &decoded.signature)
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0000000000000000000000000000000000000000000000000000000000000001";

	#[derive(Serialize)]
	#[serde(rename_all = "camelCase")]
	struct Claims<'a> {
		tx_type: &'a str,
		public_key: String,
	}

	#[tokio::test]
	async fn signed_token_verifies() {
		let signer = TokenSigner::new(KEY).unwrap();
		let token = signer
			.sign(&Claims {
				tx_type: "token_transfer",
				public_key: signer.public_key(),
			})
			.await
			.unwrap();

		assert_eq!(token.split('.').count(), 3);
		assert!(verify_token(&token).unwrap());

		let decoded = decode_token(&token).unwrap();
		assert_eq!(decoded.header["alg"], "ES256K");
		assert_eq!(decoded.header["typ"], "JWT");
		assert_eq!(decoded.payload["txType"], "token_transfer");
		assert_eq!(decoded.signature.len(), 64);
	}

	#[tokio::test]
	async fn tampered_payload_fails_verification() {
		let signer = TokenSigner::new(KEY).unwrap();
		let token = signer
			.sign(&Claims {
				tx_type: "token_transfer",
				public_key: signer.public_key(),
			})
			.await
			.unwrap();

		let mut parts: Vec<&str> = token.split('.').collect();
		let forged = URL_SAFE_NO_PAD.encode(
			serde_json::to_vec(&Claims {
				tx_type: "contract_call",
				public_key: signer.public_key(),
			})
			.unwrap(),
		);
		parts[1] = &forged;
		assert!(!verify_token(&parts.join(".")).unwrap());
	}

	#[tokio::test]
	async fn key_mismatch_fails_verification() {
		let signer = TokenSigner::new(KEY).unwrap();
		let other = TokenSigner::new(&format!("{}02", "00".repeat(31))).unwrap();
		let token = signer
			.sign(&Claims {
				tx_type: "token_transfer",
				public_key: other.public_key(),
			})
			.await
			.unwrap();
		assert!(!verify_token(&token).unwrap());
	}

	#[test]
	fn malformed_key_is_signing_error() {
		assert!(matches!(TokenSigner::new("abc"), Err(ConnectError::Signing(_))));
	}

	#[test]
	fn malformed_tokens_are_rejected() {
		assert!(decode_token("only.two").is_err());
		assert!(decode_token("a.b.c.d").is_err());
		assert!(decode_token("!!.??.##").is_err());
	}
}
