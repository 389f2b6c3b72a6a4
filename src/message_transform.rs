//! Payload transforms for inbound messages and encoding for outbound ones.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::BoxError;

/// User-supplied payload transform.
pub type CustomTransform =
	Arc<dyn Fn(&Bytes) -> Result<Payload, BoxError> + Send + Sync>;

/// Failure to turn raw payload bytes into a [`Payload`].
#[derive(Error, Debug)]
pub enum DecodeError {
	/// Payload is not valid JSON
	#[error("Invalid JSON payload: {0}")]
	Json(#[from] serde_json::Error),

	/// Payload is not valid UTF-8 text
	#[error("Invalid UTF-8 payload: {0}")]
	Utf8(#[from] std::str::Utf8Error),

	/// Custom transform rejected the payload
	#[error("Custom transform failed: {0}")]
	Custom(#[source] BoxError),
}

/// How the payload of a message is decoded before reaching a handler.
#[derive(Clone, Default)]
pub enum PayloadTransform {
	/// Parse UTF-8 JSON into a [`serde_json::Value`]
	#[default]
	Json,
	/// Decode as UTF-8 text
	Text,
	/// Pass the bytes through unchanged
	Raw,
	/// Apply a user function
	Custom(CustomTransform),
}

impl PayloadTransform {
	/// Wraps a function as a custom transform.
	pub fn custom<F>(transform: F) -> Self
	where F: Fn(&Bytes) -> Result<Payload, BoxError> + Send + Sync + 'static
	{
		Self::Custom(Arc::new(transform))
	}

	/// Short name used in logs.
	pub fn kind(&self) -> &'static str {
		match self {
			| PayloadTransform::Json => "json",
			| PayloadTransform::Text => "text",
			| PayloadTransform::Raw => "raw",
			| PayloadTransform::Custom(_) => "custom",
		}
	}

	/// Decodes the raw payload.
	pub fn decode(&self, payload: &Bytes) -> Result<Payload, DecodeError> {
		match self {
			| PayloadTransform::Json => {
				Ok(Payload::Json(serde_json::from_slice(payload)?))
			}
			| PayloadTransform::Text => {
				Ok(Payload::Text(std::str::from_utf8(payload)?.to_owned()))
			}
			| PayloadTransform::Raw => Ok(Payload::Raw(payload.clone())),
			| PayloadTransform::Custom(transform) => {
				transform(payload).map_err(DecodeError::Custom)
			}
		}
	}
}

impl fmt::Debug for PayloadTransform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.kind())
	}
}

/// Decoded payload handed to handlers.
#[derive(Clone, Debug)]
pub enum Payload {
	/// Structured JSON value
	Json(serde_json::Value),
	/// UTF-8 text
	Text(String),
	/// Untouched bytes
	Raw(Bytes),
	/// Value produced by a custom transform
	Custom(Arc<dyn Any + Send + Sync>),
}

impl Payload {
	/// Wraps any value produced by a custom transform.
	pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
		Self::Custom(Arc::new(value))
	}

	/// Variant name used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			| Payload::Json(_) => "json",
			| Payload::Text(_) => "text",
			| Payload::Raw(_) => "raw",
			| Payload::Custom(_) => "custom",
		}
	}

	pub fn as_json(&self) -> Option<&serde_json::Value> {
		match self {
			| Payload::Json(value) => Some(value),
			| _ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			| Payload::Text(text) => Some(text),
			| _ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&Bytes> {
		match self {
			| Payload::Raw(bytes) => Some(bytes),
			| _ => None,
		}
	}

	/// Borrows the value of a custom payload as `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			| Payload::Custom(value) => value.downcast_ref::<T>(),
			| _ => None,
		}
	}

	/// Deserializes the payload into `T`.
	///
	/// JSON values are converted directly; text and raw payloads are parsed
	/// as JSON documents.
	pub fn deserialize<T: DeserializeOwned>(
		&self,
	) -> Option<Result<T, serde_json::Error>> {
		match self {
			| Payload::Json(value) => Some(T::deserialize(value)),
			| Payload::Text(text) => Some(serde_json::from_str(text)),
			| Payload::Raw(bytes) => Some(serde_json::from_slice(bytes)),
			| Payload::Custom(_) => None,
		}
	}
}

/// Message body accepted by `publish`.
///
/// Structured values are serialized to UTF-8 JSON before publishing.
#[derive(Clone, Debug)]
pub enum OutboundPayload {
	/// Text sent as its UTF-8 bytes
	Text(String),
	/// Bytes sent verbatim
	Bytes(Bytes),
	/// Structured value sent as JSON
	Json(serde_json::Value),
}

impl OutboundPayload {
	/// Converts any serializable value into a structured payload.
	pub fn json<T: Serialize + ?Sized>(
		value: &T,
	) -> Result<Self, serde_json::Error> {
		serde_json::to_value(value).map(Self::Json)
	}

	/// Encodes the payload into the bytes handed to the transport.
	pub fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
		match self {
			| OutboundPayload::Text(text) => Ok(Bytes::from(text)),
			| OutboundPayload::Bytes(bytes) => Ok(bytes),
			| OutboundPayload::Json(value) => {
				serde_json::to_vec(&value).map(Bytes::from)
			}
		}
	}
}

impl From<&str> for OutboundPayload {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<String> for OutboundPayload {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<Bytes> for OutboundPayload {
	fn from(bytes: Bytes) -> Self {
		Self::Bytes(bytes)
	}
}

impl From<Vec<u8>> for OutboundPayload {
	fn from(bytes: Vec<u8>) -> Self {
		Self::Bytes(Bytes::from(bytes))
	}
}

impl From<&[u8]> for OutboundPayload {
	fn from(bytes: &[u8]) -> Self {
		Self::Bytes(Bytes::copy_from_slice(bytes))
	}
}

impl From<serde_json::Value> for OutboundPayload {
	fn from(value: serde_json::Value) -> Self {
		Self::Json(value)
	}
}

#[cfg(test)]
mod tests {
	use serde::Deserialize;
	use serde_json::json;

	use super::*;

	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	struct Reading {
		sensor: String,
		value: f64,
	}

	#[test]
	fn test_json_round_trip_through_publish_encoding() {
		let value = json!({"sensor": "t1", "value": 21.5, "tags": ["a", "b"]});
		let bytes = OutboundPayload::from(value.clone()).into_bytes().unwrap();

		let decoded = PayloadTransform::Json.decode(&bytes).unwrap();
		assert_eq!(decoded.as_json(), Some(&value));
	}

	#[test]
	fn test_typed_value_round_trip() {
		let reading = Reading {
			sensor: "t1".into(),
			value: 3.25,
		};
		let bytes = OutboundPayload::json(&reading)
			.unwrap()
			.into_bytes()
			.unwrap();

		let decoded = PayloadTransform::default().decode(&bytes).unwrap();
		let back: Reading = decoded.deserialize().unwrap().unwrap();
		assert_eq!(back, reading);
	}

	#[test]
	fn test_malformed_json_is_a_decode_error() {
		let err = PayloadTransform::Json
			.decode(&Bytes::from_static(b"{not json"))
			.unwrap_err();
		assert!(matches!(err, DecodeError::Json(_)));
	}

	#[test]
	fn test_text_and_raw_transforms() {
		let bytes = Bytes::from_static(b"hello");
		let text = PayloadTransform::Text.decode(&bytes).unwrap();
		assert_eq!(text.as_text(), Some("hello"));

		let raw = PayloadTransform::Raw.decode(&bytes).unwrap();
		assert_eq!(raw.as_bytes(), Some(&bytes));

		let invalid = Bytes::from_static(&[0xff, 0xfe]);
		assert!(matches!(
			PayloadTransform::Text.decode(&invalid),
			Err(DecodeError::Utf8(_))
		));
	}

	#[test]
	fn test_custom_transform() {
		let transform = PayloadTransform::custom(|bytes| {
			let text = std::str::from_utf8(bytes)?;
			Ok(Payload::custom(text.parse::<u32>()?))
		});
		let payload = transform.decode(&Bytes::from_static(b"42")).unwrap();
		assert_eq!(payload.downcast_ref::<u32>(), Some(&42));

		let err = transform.decode(&Bytes::from_static(b"x")).unwrap_err();
		assert!(matches!(err, DecodeError::Custom(_)));
	}

	#[test]
	fn test_text_is_published_verbatim() {
		let bytes = OutboundPayload::from("plain").into_bytes().unwrap();
		assert_eq!(&bytes[..], b"plain");
	}
}
