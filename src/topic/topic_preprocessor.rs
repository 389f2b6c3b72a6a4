use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;
use tracing::debug;

use super::limits::MAX_TOPIC_LENGTH;
use crate::routing::SubscriptionDescriptor;

/// Namespace prefix for queue (load-balanced) subscriptions.
pub const QUEUE_PREFIX: &str = "$queue/";
/// Namespace prefix for shared subscriptions, followed by `<group>/`.
pub const SHARE_PREFIX: &str = "$share/";

/// Resolves a topic variable name to its value.
///
/// Invoked once per `${name}` occurrence while preprocessing.
pub type TopicResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Removes a leading `$queue/` and/or `$share/<group>/` namespace.
///
/// Any non-empty group is accepted, so every group applied by
/// [`TopicPreprocessor`] strips back to the canonical route. Topics without
/// a namespace are returned unchanged.
pub fn strip_namespace(topic: &str) -> &str {
	let topic = topic.strip_prefix(QUEUE_PREFIX).unwrap_or(topic);
	match topic.strip_prefix(SHARE_PREFIX).and_then(|rest| rest.split_once('/'))
	{
		| Some((group, rest)) if !group.is_empty() => rest,
		| _ => topic,
	}
}

/// Turns raw subscription patterns into the topics sent to the broker.
///
/// Holds the module-level defaults; each
/// [`SubscriptionDescriptor`] may override the queue flag and share group.
#[derive(Clone, Default)]
pub struct TopicPreprocessor {
	queue: bool,
	share: Option<ArcStr>,
	resolver: Option<TopicResolver>,
}

impl TopicPreprocessor {
	/// Preprocessor with no namespace defaults and no resolver.
	pub fn new() -> Self {
		Self::default()
	}

	/// Default queue flag for subscriptions that do not set one.
	pub fn with_queue(mut self, queue: bool) -> Self {
		self.queue = queue;
		self
	}

	/// Default share group for subscriptions that do not set one.
	pub fn with_share(mut self, group: Option<ArcStr>) -> Self {
		self.share = group;
		self
	}

	/// Resolver for `${name}` variables in raw patterns.
	pub fn with_resolver(mut self, resolver: Option<TopicResolver>) -> Self {
		self.resolver = resolver;
		self
	}

	/// Preprocesses every raw pattern of the descriptor, in declaration order.
	pub fn preprocess(&self, descriptor: &SubscriptionDescriptor) -> Vec<ArcStr> {
		descriptor
			.topics()
			.iter()
			.map(|topic| {
				self.preprocess_topic(
					topic,
					descriptor.queue_override(),
					descriptor.share_override().map(ArcStr::as_str),
				)
			})
			.collect()
	}

	/// Preprocesses a single raw pattern.
	///
	/// The existing namespace is stripped, variables are resolved, then
	/// exactly one namespace is applied. Queue wins over share; an empty
	/// share group means no shared subscription.
	pub fn preprocess_topic(
		&self,
		raw: &str,
		queue: Option<bool>,
		share: Option<&str>,
	) -> ArcStr {
		let queue = queue.unwrap_or(self.queue);
		let share = share
			.or(self.share.as_deref())
			.filter(|group| !group.is_empty());

		let stripped = strip_namespace(raw);
		let topic = match &self.resolver {
			| Some(resolver) if raw.len() < MAX_TOPIC_LENGTH => {
				resolve_variables(stripped, resolver.as_ref())
			}
			| Some(_) => {
				debug!(
					length = raw.len(),
					"Topic pattern too long, skipping variable resolution"
				);
				stripped.to_string()
			}
			| None => stripped.to_string(),
		};

		if queue {
			arcstr::format!("{QUEUE_PREFIX}{topic}")
		} else if let Some(group) = share {
			arcstr::format!("{SHARE_PREFIX}{group}/{topic}")
		} else {
			ArcStr::from(topic)
		}
	}
}

impl fmt::Debug for TopicPreprocessor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TopicPreprocessor")
			.field("queue", &self.queue)
			.field("share", &self.share)
			.field("resolver", &self.resolver.is_some())
			.finish()
	}
}

/// Replaces every `${name}` token with the resolver's value for `name`.
fn resolve_variables(
	topic: &str,
	resolver: &(dyn Fn(&str) -> String + Send + Sync),
) -> String {
	let mut resolved = String::with_capacity(topic.len());
	let mut rest = topic;

	while let Some(start) = rest.find("${") {
		let after = &rest[start + 2 ..];
		match after.find('}') {
			| Some(end) if is_variable_name(&after[.. end]) => {
				resolved.push_str(&rest[.. start]);
				resolved.push_str(&resolver(&after[.. end]));
				rest = &after[end + 1 ..];
			}
			| _ => {
				resolved.push_str(&rest[.. start + 2]);
				rest = after;
			}
		}
	}
	resolved.push_str(rest);
	resolved
}

fn is_variable_name(name: &str) -> bool {
	!name.is_empty()
		&& name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
