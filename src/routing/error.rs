use arcstr::ArcStr;
use thiserror::Error;

use crate::BoxError;
use crate::message_transform::DecodeError;
use crate::transport::TransportError;

/// Subscribe request for a wire topic was not acknowledged.
#[derive(Debug, Error)]
#[error("Failed to subscribe to '{topic}': {source}")]
pub struct SubscriptionError {
	/// Wire topic, including any namespace prefix
	pub topic: ArcStr,
	/// Transport failure
	#[source]
	pub source: TransportError,
}

/// Failure while delivering one inbound message.
///
/// Dispatch errors are logged by the dispatcher and never stop the loop.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// Payload could not be decoded with the subscription's transform
	#[error("Failed to decode payload on '{topic}' as {transform}: {source}")]
	Decode {
		/// Message topic
		topic: ArcStr,
		/// Transform name
		transform: &'static str,
		/// Underlying decode failure
		#[source]
		source: DecodeError,
	},

	/// Pre-handle hook returned an error
	#[error("Pre-handle hook failed on '{topic}': {source}")]
	Hook {
		/// Message topic
		topic: ArcStr,
		/// Error returned by the hook
		#[source]
		source: BoxError,
	},

	/// Handler returned an error
	#[error("Handler {owner} failed on '{topic}': {source}")]
	Handler {
		/// Handler owner label
		owner: ArcStr,
		/// Message topic
		topic: ArcStr,
		/// Error returned by the handler
		#[source]
		source: BoxError,
	},

	/// A parameter binding points past the last allowed slot
	#[error(
		"Handler {owner} binds argument {index}, at most {max} slots are \
		 allowed"
	)]
	InvalidBinding {
		/// Handler owner label
		owner: ArcStr,
		/// Offending argument index
		index: usize,
		/// Slot limit
		max: usize,
	},

	/// Payload transform, hook or handler panicked
	#[error("{stage} panicked on '{topic}': {message}")]
	Panicked {
		/// `payload transform`, `pre-handle hook` or the handler owner label
		stage: ArcStr,
		/// Message topic
		topic: ArcStr,
		/// Panic payload, when it was a string
		message: String,
	},
}
