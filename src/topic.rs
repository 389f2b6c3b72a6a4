//! Topic handling module
//!
//! This module provides components for working with MQTT topic patterns:
//! compiling patterns into matchers, extracting wildcard captures, and
//! resolving queue/share namespaces and topic variables before subscribing.

// Submodules
pub mod error;
pub mod pattern_segment;
pub mod topic_match;
/// Pattern compilation and matching
pub mod topic_matcher;
/// Namespace prefixes and topic variable resolution
pub mod topic_preprocessor;

#[cfg(test)]
mod topic_preprocessor_tests;

// Re-export commonly used types for convenience
pub use error::{PatternResult, TopicError, TopicResult};
// Re-export constants and validation utilities
pub use error::{limits, validation};
pub use pattern_segment::{PatternSegment, TopicPatternError};
pub use topic_match::TopicMatch;
pub use topic_matcher::TopicMatcher;
pub use topic_preprocessor::{
	QUEUE_PREFIX, SHARE_PREFIX, TopicPreprocessor, TopicResolver,
	strip_namespace,
};
