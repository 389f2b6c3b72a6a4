use std::fmt;

use arcstr::Substr;
use thiserror::Error;

/// Why a subscription pattern cannot be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicPatternError {
	/// Empty or whitespace-only pattern
	#[error("Topic pattern cannot be empty")]
	Empty,

	/// `#` followed by further segments
	#[error("'#' must be the last segment of '{pattern}'")]
	MultiLevelNotLast {
		/// The rejected pattern
		pattern: String,
	},

	/// A segment mixing a wildcard with other characters, e.g. `a+` or `#b`
	#[error("Segment '{segment}' mixes a wildcard with literal text")]
	MixedWildcard {
		/// The offending segment
		segment: String,
	},

	/// More segments than [`MAX_TOPIC_DEPTH`](super::limits::MAX_TOPIC_DEPTH)
	#[error("Pattern has {depth} segments, at most {max} are allowed")]
	TooDeep {
		/// Segment count of the pattern
		depth: usize,
		/// Configured maximum
		max: usize,
	},
}

/// One `/`-separated segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
	/// Compared byte for byte with the topic segment
	Literal(Substr),
	/// `+`
	SingleLevel,
	/// `#`
	MultiLevel,
}

impl PatternSegment {
	/// Classifies a raw pattern segment.
	pub fn parse(segment: Substr) -> Result<Self, TopicPatternError> {
		match segment.as_str() {
			| "+" => Ok(Self::SingleLevel),
			| "#" => Ok(Self::MultiLevel),
			| text if text.contains(['+', '#']) => {
				Err(TopicPatternError::MixedWildcard {
					segment: text.to_string(),
				})
			}
			| _ => Ok(Self::Literal(segment)),
		}
	}

	pub fn is_wildcard(&self) -> bool {
		!matches!(self, Self::Literal(_))
	}
}

impl fmt::Display for PatternSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| Self::Literal(text) => f.write_str(text),
			| Self::SingleLevel => f.write_str("+"),
			| Self::MultiLevel => f.write_str("#"),
		}
	}
}
