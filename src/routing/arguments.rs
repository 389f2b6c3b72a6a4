use std::str::FromStr;
use std::sync::Arc;

use arcstr::{ArcStr, Substr};
use rumqttc::Publish;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::descriptor::ParameterKind;
use crate::BoxError;
use crate::message_transform::Payload;

/// Failure to read a typed value out of [`HandlerArgs`].
#[derive(Debug, Error)]
pub enum ArgumentError {
	/// No value is bound at this index
	#[error("No argument bound at index {index}")]
	Missing {
		/// Argument index
		index: usize,
	},

	/// The slot holds a different kind of value
	#[error("Argument {index} is {actual:?}, expected {expected:?}")]
	KindMismatch {
		/// Argument index
		index: usize,
		/// Requested kind
		expected: ParameterKind,
		/// Kind found in the slot
		actual: ParameterKind,
	},

	/// The capture list is shorter than the requested position
	#[error("Wildcard capture {position} not present at argument {index}")]
	CaptureMissing {
		/// Argument index
		index: usize,
		/// Position in the capture list
		position: usize,
	},

	/// The payload variant cannot produce the requested value
	#[error("Payload at argument {index} is {payload}, cannot convert")]
	UnsupportedPayload {
		/// Argument index
		index: usize,
		/// Payload variant name
		payload: &'static str,
	},

	/// A wildcard capture could not be parsed into the requested type
	#[error("Failed to parse capture '{value}' at position {position}: {source}")]
	CaptureParse {
		/// Raw capture text
		value: Substr,
		/// Position in the capture list
		position: usize,
		/// Parser error
		#[source]
		source: BoxError,
	},

	/// Payload could not be deserialized into the requested type
	#[error("Failed to deserialize payload: {0}")]
	Payload(#[from] serde_json::Error),
}

/// Value placed in one handler argument slot.
#[derive(Debug, Clone)]
pub enum HandlerArg {
	Payload(Payload),
	Topic(ArcStr),
	Packet(Arc<Publish>),
	Params(Vec<Substr>),
}

impl HandlerArg {
	pub fn kind(&self) -> ParameterKind {
		match self {
			| HandlerArg::Payload(_) => ParameterKind::Payload,
			| HandlerArg::Topic(_) => ParameterKind::Topic,
			| HandlerArg::Packet(_) => ParameterKind::Packet,
			| HandlerArg::Params(_) => ParameterKind::Params,
		}
	}
}

/// Positional arguments built for one handler invocation.
///
/// The list is as long as the highest bound index plus one. Slots without
/// a binding hold `None`.
#[derive(Debug, Clone, Default)]
pub struct HandlerArgs {
	slots: Vec<Option<HandlerArg>>,
}

impl HandlerArgs {
	pub(crate) fn from_slots(slots: Vec<Option<HandlerArg>>) -> Self {
		Self { slots }
	}

	pub fn get(&self, index: usize) -> Option<&HandlerArg> {
		self.slots.get(index).and_then(Option::as_ref)
	}

	/// Number of positional slots, bound or not.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = Option<&HandlerArg>> {
		self.slots.iter().map(Option::as_ref)
	}

	fn slot(&self, index: usize) -> Result<&HandlerArg, ArgumentError> {
		self.get(index).ok_or(ArgumentError::Missing { index })
	}

	fn mismatch(
		index: usize,
		expected: ParameterKind,
		actual: &HandlerArg,
	) -> ArgumentError {
		ArgumentError::KindMismatch {
			index,
			expected,
			actual: actual.kind(),
		}
	}

	pub fn payload(&self, index: usize) -> Result<&Payload, ArgumentError> {
		match self.slot(index)? {
			| HandlerArg::Payload(payload) => Ok(payload),
			| other => Err(Self::mismatch(index, ParameterKind::Payload, other)),
		}
	}

	/// Deserializes the payload at `index` into `T`.
	///
	/// Custom payloads are not serde values and always fail.
	pub fn json<T: DeserializeOwned>(
		&self,
		index: usize,
	) -> Result<T, ArgumentError> {
		match self.payload(index)?.deserialize() {
			| Some(result) => Ok(result?),
			| None => Err(ArgumentError::UnsupportedPayload {
				index,
				payload: "custom",
			}),
		}
	}

	/// Text of a `text` payload at `index`.
	pub fn text(&self, index: usize) -> Result<&str, ArgumentError> {
		let payload = self.payload(index)?;
		payload
			.as_text()
			.ok_or(ArgumentError::UnsupportedPayload {
				index,
				payload: payload.kind(),
			})
	}

	pub fn topic(&self, index: usize) -> Result<&ArcStr, ArgumentError> {
		match self.slot(index)? {
			| HandlerArg::Topic(topic) => Ok(topic),
			| other => Err(Self::mismatch(index, ParameterKind::Topic, other)),
		}
	}

	pub fn packet(&self, index: usize) -> Result<&Publish, ArgumentError> {
		match self.slot(index)? {
			| HandlerArg::Packet(packet) => Ok(packet),
			| other => Err(Self::mismatch(index, ParameterKind::Packet, other)),
		}
	}

	pub fn params(&self, index: usize) -> Result<&[Substr], ArgumentError> {
		match self.slot(index)? {
			| HandlerArg::Params(params) => Ok(params),
			| other => Err(Self::mismatch(index, ParameterKind::Params, other)),
		}
	}

	/// Parses one wildcard capture of the list at `index`.
	///
	/// ```rust
	/// # use mqtt_topic_dispatch::routing::HandlerArgs;
	/// # fn read(args: &HandlerArgs) -> Result<u32, Box<dyn std::error::Error>> {
	/// // pattern "devices/+/slot/+", params bound at index 1
	/// let slot: u32 = args.param(1, 1)?;
	/// # Ok(slot)
	/// # }
	/// ```
	pub fn param<T>(
		&self,
		index: usize,
		position: usize,
	) -> Result<T, ArgumentError>
	where
		T: FromStr,
		T::Err: std::error::Error + Send + Sync + 'static,
	{
		let value = self
			.params(index)?
			.get(position)
			.ok_or(ArgumentError::CaptureMissing { index, position })?;
		value
			.parse::<T>()
			.map_err(|err| ArgumentError::CaptureParse {
				value: value.clone(),
				position,
				source: Box::new(err),
			})
	}
}

#[cfg(test)]
mod tests {
	use rumqttc::QoS;
	use serde::Deserialize;
	use serde_json::json;

	use super::*;

	fn captures(topic: &str, ranges: &[(usize, usize)]) -> Vec<Substr> {
		let topic = ArcStr::from(topic);
		ranges
			.iter()
			.map(|&(start, end)| topic.substr(start .. end))
			.collect()
	}

	#[test]
	fn test_typed_accessors() {
		let packet = Arc::new(Publish::new(
			"devices/42/temp",
			QoS::AtMostOnce,
			Vec::<u8>::new(),
		));
		let args = HandlerArgs::from_slots(vec![
			Some(HandlerArg::Payload(Payload::Json(json!({"value": 1})))),
			None,
			Some(HandlerArg::Topic(ArcStr::from("devices/42/temp"))),
			Some(HandlerArg::Params(captures("devices/42/temp", &[(8, 10)]))),
			Some(HandlerArg::Packet(packet)),
		]);

		assert_eq!(args.len(), 5);
		assert!(args.get(1).is_none());
		assert_eq!(args.topic(2).unwrap().as_str(), "devices/42/temp");
		assert_eq!(args.param::<u32>(3, 0).unwrap(), 42);
		assert_eq!(args.packet(4).unwrap().topic, "devices/42/temp");

		#[derive(Deserialize)]
		struct Reading {
			value: i64,
		}
		assert_eq!(args.json::<Reading>(0).unwrap().value, 1);
	}

	#[test]
	fn test_accessor_errors() {
		let args = HandlerArgs::from_slots(vec![
			Some(HandlerArg::Topic(ArcStr::from("a/b"))),
			Some(HandlerArg::Params(captures("a/b", &[(2, 3)]))),
		]);

		assert!(matches!(
			args.payload(0),
			Err(ArgumentError::KindMismatch {
				expected: ParameterKind::Payload,
				actual: ParameterKind::Topic,
				..
			})
		));
		assert!(matches!(args.topic(5), Err(ArgumentError::Missing { .. })));
		assert!(matches!(
			args.param::<u32>(1, 3),
			Err(ArgumentError::CaptureMissing { position: 3, .. })
		));
		assert!(matches!(
			args.param::<u32>(1, 0),
			Err(ArgumentError::CaptureParse { .. })
		));
	}
}
