//! Error types and utilities for the topic module
//!
//! This module contains the composite error type and shared constants
//! for the entire topic module, while individual error types remain
//! in their respective modules.

use thiserror::Error;

use super::pattern_segment::TopicPatternError;

/// Comprehensive error type for all topic-related operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// Topic pattern parsing or validation error
	#[error("Topic pattern error: {0}")]
	Pattern(#[from] TopicPatternError),

	/// Concrete topic is not valid for publishing
	#[error("Topic '{topic}' is invalid: {reason}")]
	InvalidTopic {
		/// The rejected topic
		topic: String,
		/// Why it was rejected
		reason: String,
	},
}

impl TopicError {
	/// Creates a new InvalidTopic error
	pub fn invalid_topic(
		topic: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self::InvalidTopic {
			topic: topic.into(),
			reason: reason.into(),
		}
	}
}

/// Convenient Result type for topic operations
pub type TopicResult<T> = Result<T, TopicError>;

/// Convenient Result type for pattern operations
pub type PatternResult<T> = Result<T, TopicPatternError>;

/// Topic processing limits and constants
pub mod limits {
	/// Maximum topic nesting depth allowed in a pattern
	pub const MAX_TOPIC_DEPTH: usize = 32;

	/// Maximum total topic path length.
	///
	/// Raw patterns at or above this length skip variable resolution.
	pub const MAX_TOPIC_LENGTH: usize = 1024;

	/// Maximum length of a publish topic as allowed by the MQTT protocol
	pub const MAX_PUBLISH_TOPIC_LENGTH: usize = 65535;
}

/// Validation utilities for topic operations
pub mod validation {
	use super::limits::*;
	use super::{TopicError, TopicPatternError};

	/// Validates a concrete topic used for publishing.
	pub fn validate_publish_topic(topic: &str) -> Result<(), TopicError> {
		if topic.is_empty() || topic.len() > MAX_PUBLISH_TOPIC_LENGTH {
			return Err(TopicError::invalid_topic(
				topic,
				"Topic is empty or too long",
			));
		}
		if topic.chars().any(|c| matches!(c, '\0' | '#' | '+')) {
			return Err(TopicError::invalid_topic(
				topic,
				"Topic contains illegal characters ('#', '+', or null byte)",
			));
		}
		Ok(())
	}

	/// Validates topic pattern for subscription constraints
	pub fn validate_pattern_for_subscription(
		pattern: &str,
	) -> Result<(), TopicPatternError> {
		if pattern.is_empty() || pattern.trim().is_empty() {
			return Err(TopicPatternError::Empty);
		}

		let depth = pattern.split('/').count();
		if depth > MAX_TOPIC_DEPTH {
			return Err(TopicPatternError::TooDeep {
				depth,
				max: MAX_TOPIC_DEPTH,
			});
		}

		Ok(())
	}
}
