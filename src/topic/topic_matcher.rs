use std::sync::Arc;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;
use tracing::warn;

use super::pattern_segment::{PatternSegment, TopicPatternError};
use super::topic_match::{CaptureSpan, CaptureSpans, TopicMatch};
use super::validation;

/// Compiled MQTT subscription pattern.
///
/// A matcher is immutable once compiled: [`is_match`](Self::is_match) and
/// [`captures`](Self::captures) take `&self` and keep no state between calls,
/// so one matcher can be shared freely across tasks.
///
/// - `+` matches exactly one non-empty segment
/// - a trailing `#` matches zero or more trailing segments
/// - every other segment is compared verbatim, anchored at both ends
///
/// Patterns must already be stripped of `$queue/` and `$share/<group>/`
/// namespaces (see [`TopicPreprocessor`](super::TopicPreprocessor)).
#[derive(Debug, Clone)]
pub struct TopicMatcher {
	pattern: ArcStr,
	/// `None` for malformed patterns, which never match.
	segments: Option<Arc<[PatternSegment]>>,
}

impl TopicMatcher {
	/// Compiles a pattern, falling back to a never-matching matcher when the
	/// pattern is malformed.
	pub fn compile(pattern: impl Into<ArcStr>) -> Self {
		let pattern = pattern.into();
		match Self::parse_segments(&pattern) {
			| Ok(segments) => Self {
				pattern,
				segments: Some(segments.into()),
			},
			| Err(err) => {
				warn!(
					pattern = %pattern,
					error = %err,
					"Malformed topic pattern, it will never match"
				);
				Self {
					pattern,
					segments: None,
				}
			}
		}
	}

	/// Compiles a pattern, reporting why it is malformed.
	pub fn try_compile(
		pattern: impl Into<ArcStr>,
	) -> Result<Self, TopicPatternError> {
		let pattern = pattern.into();
		let segments = Self::parse_segments(&pattern)?;
		Ok(Self {
			pattern,
			segments: Some(segments.into()),
		})
	}

	fn parse_segments(
		pattern: &ArcStr,
	) -> Result<Vec<PatternSegment>, TopicPatternError> {
		validation::validate_pattern_for_subscription(pattern)?;

		let segments = pattern
			.split('/')
			.map(|s| pattern.substr_from(s))
			.map(PatternSegment::parse)
			.collect::<Result<Vec<_>, _>>()?;

		let last = segments.len() - 1;
		if segments[.. last].contains(&PatternSegment::MultiLevel) {
			return Err(TopicPatternError::MultiLevelNotLast {
				pattern: pattern.to_string(),
			});
		}
		Ok(segments)
	}

	/// Pattern this matcher was compiled from.
	pub fn pattern(&self) -> &ArcStr {
		&self.pattern
	}

	/// Returns false if the pattern was malformed.
	pub fn is_valid(&self) -> bool {
		self.segments.is_some()
	}

	/// Number of wildcard tokens, i.e. the length of every capture list.
	pub fn wildcard_count(&self) -> usize {
		self.segments.as_deref().map_or(0, |segments| {
			segments.iter().filter(|s| s.is_wildcard()).count()
		})
	}

	/// Tests whether the whole topic matches this pattern.
	pub fn is_match(&self, topic: &str) -> bool {
		let segments: SmallVec<[&str; 8]> = topic.split('/').collect();
		self.match_segments(&segments).is_some()
	}

	/// Matches the topic and extracts wildcard captures in pattern order.
	///
	/// A `+` captures its segment; a trailing `#` captures the remainder of
	/// the topic including its leading `/`, or `""` when nothing follows.
	pub fn captures(&self, topic: impl Into<ArcStr>) -> Option<TopicMatch> {
		let topic = topic.into();
		let segments: SmallVec<[Substr; 8]> =
			topic.split('/').map(|s| topic.substr_from(s)).collect();
		let spans = self.match_segments(&segments)?;
		Some(TopicMatch::resolve(topic, &segments, spans))
	}

	fn match_segments<S: AsRef<str>>(
		&self,
		topic: &[S],
	) -> Option<CaptureSpans> {
		let pattern = self.segments.as_deref()?;
		let mut topic_index = 0;
		let mut params = CaptureSpans::new();

		for pattern_segment in pattern {
			match pattern_segment {
				| PatternSegment::Literal(expected) => {
					let segment = topic.get(topic_index)?;
					if segment.as_ref() != expected.as_str() {
						return None;
					}
					topic_index += 1;
				}
				| PatternSegment::SingleLevel => {
					let segment = topic.get(topic_index)?;
					if segment.as_ref().is_empty() {
						return None;
					}
					params.push(CaptureSpan::Segment(topic_index));
					topic_index += 1;
				}
				| PatternSegment::MultiLevel => {
					// '#' is always last, it takes whatever remains
					params.push(CaptureSpan::Remainder(
						topic_index .. topic.len(),
					));
					return Some(params);
				}
			}
		}
		(topic_index == topic.len()).then_some(params)
	}
}

impl std::fmt::Display for TopicMatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}
