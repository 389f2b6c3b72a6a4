use std::fmt;
use std::ops::Range;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

/// Topic segments covered by one wildcard.
#[derive(Debug, Clone)]
pub(crate) enum CaptureSpan {
	/// Segment index matched by `+`
	Segment(usize),
	/// Segment indices taken by a trailing `#`, possibly empty
	Remainder(Range<usize>),
}

pub(crate) type CaptureSpans = SmallVec<[CaptureSpan; 3]>;

/// Topic accepted by a [`TopicMatcher`](super::TopicMatcher), with its
/// wildcard captures in left-to-right pattern order.
///
/// Captures borrow the topic's allocation.
#[derive(Clone)]
pub struct TopicMatch {
	topic: ArcStr,
	captures: SmallVec<[Substr; 3]>,
}

impl TopicMatch {
	/// Resolves capture spans against the split topic.
	///
	/// A `#` that follows other segments captures the remainder together
	/// with its leading `/`, so `a/#` yields `/b/c` for `a/b/c`. When no
	/// segment follows, the capture is `""`; any present remainder starts
	/// with `/`, which keeps the two cases apart. A lone `#` captures the
	/// whole topic.
	pub(crate) fn resolve(
		topic: ArcStr,
		segments: &[Substr],
		spans: CaptureSpans,
	) -> Self {
		let captures = spans
			.into_iter()
			.map(|span| match span {
				| CaptureSpan::Segment(index) => segments[index].clone(),
				| CaptureSpan::Remainder(range) if range.is_empty() => {
					topic.substr(0 .. 0)
				}
				| CaptureSpan::Remainder(range) => {
					let start = match range.start {
						| 0 => 0,
						| first => segments[first].range().start - 1,
					};
					let end = segments[range.end - 1].range().end;
					topic.substr(start .. end)
				}
			})
			.collect();
		Self { topic, captures }
	}

	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	pub fn len(&self) -> usize {
		self.captures.len()
	}

	pub fn is_empty(&self) -> bool {
		self.captures.is_empty()
	}

	/// Capture of the wildcard at `position`.
	pub fn get(&self, position: usize) -> Option<&Substr> {
		self.captures.get(position)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Substr> {
		self.captures.iter()
	}

	/// Ordered capture list, as handed to `params` arguments.
	pub fn into_captures(self) -> Vec<Substr> {
		self.captures.into_vec()
	}
}

impl fmt::Debug for TopicMatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TopicMatch")
			.field("topic", &self.topic.as_str())
			.field(
				"captures",
				&self.captures.iter().map(Substr::as_str).collect::<Vec<_>>(),
			)
			.finish()
	}
}
