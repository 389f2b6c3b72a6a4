use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;
use rumqttc::QoS;
use tracing::{error, info};

use super::descriptor::{
	MAX_HANDLER_ARGUMENTS, ParameterBinding, SubscriptionDescriptor,
};
use super::error::SubscriptionError;
use super::handler::{HandlerRegistration, MessageHandler};
use crate::topic::{TopicMatcher, TopicPreprocessor, strip_namespace};
use crate::transport::Transport;

/// Registered binding of one subscribed topic to a handler.
#[derive(Clone)]
pub struct SubscriberEntry {
	topic: ArcStr,
	route: ArcStr,
	matcher: TopicMatcher,
	handler: Arc<dyn MessageHandler>,
	owner: ArcStr,
	descriptor: Arc<SubscriptionDescriptor>,
	parameters: Arc<[ParameterBinding]>,
}

impl SubscriberEntry {
	/// Topic as sent to the broker, including any namespace prefix.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	/// Canonical topic pattern without namespace.
	pub fn route(&self) -> &ArcStr {
		&self.route
	}

	pub fn matcher(&self) -> &TopicMatcher {
		&self.matcher
	}

	pub fn handler(&self) -> &Arc<dyn MessageHandler> {
		&self.handler
	}

	pub fn owner(&self) -> &ArcStr {
		&self.owner
	}

	pub fn descriptor(&self) -> &SubscriptionDescriptor {
		&self.descriptor
	}

	pub fn parameters(&self) -> &[ParameterBinding] {
		&self.parameters
	}
}

impl fmt::Debug for SubscriberEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubscriberEntry")
			.field("topic", &self.topic)
			.field("route", &self.route)
			.field("owner", &self.owner)
			.field("parameters", &self.parameters)
			.finish_non_exhaustive()
	}
}

/// Ordered list of subscriber entries.
///
/// Built during startup registration and read-only afterwards. Lookup scans
/// in registration order and the first accepting matcher wins, so when
/// patterns overlap the earliest registration receives the message.
/// Messages are never broadcast to several entries.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
	preprocessor: TopicPreprocessor,
	entries: Vec<SubscriberEntry>,
}

impl SubscriptionRegistry {
	pub fn new(preprocessor: TopicPreprocessor) -> Self {
		Self {
			preprocessor,
			entries: Vec::new(),
		}
	}

	pub fn preprocessor(&self) -> &TopicPreprocessor {
		&self.preprocessor
	}

	/// Subscribes every topic of the registration and appends one entry per
	/// acknowledged topic.
	///
	/// Topics are subscribed sequentially. A rejected topic is logged and
	/// skipped; the remaining topics are still registered. A registration
	/// binding an argument index at or above [`MAX_HANDLER_ARGUMENTS`] is
	/// rejected before subscribing. Returns the number of entries added.
	pub async fn register(
		&mut self,
		transport: &dyn Transport,
		registration: HandlerRegistration,
	) -> usize {
		let HandlerRegistration {
			descriptor,
			parameters,
			handler,
			owner,
		} = registration;
		if let Some(binding) = parameters
			.iter()
			.find(|binding| binding.index >= MAX_HANDLER_ARGUMENTS)
		{
			error!(
				owner = %owner,
				index = binding.index,
				max = MAX_HANDLER_ARGUMENTS,
				"Argument index out of range, registration skipped"
			);
			return 0;
		}

		let qos = descriptor.requested_qos();
		let mut added = 0;

		for topic in self.preprocessor.preprocess(&descriptor) {
			if let Err(source) = transport.subscribe(&topic, qos).await {
				let err = SubscriptionError {
					topic: topic.clone(),
					source,
				};
				error!(owner = %owner, error = %err, "Subscription failed");
				continue;
			}

			let route = ArcStr::from(strip_namespace(&topic));
			let matcher = TopicMatcher::compile(route.clone());
			info!(
				owner = %owner,
				topic = %topic,
				route = %route,
				"Subscribed"
			);
			self.entries.push(SubscriberEntry {
				topic,
				route,
				matcher,
				handler: handler.clone(),
				owner: owner.clone(),
				descriptor: descriptor.clone(),
				parameters: parameters.clone(),
			});
			added += 1;
		}
		added
	}

	/// First entry, in registration order, whose pattern accepts `topic`.
	pub fn lookup(&self, topic: &str) -> Option<&SubscriberEntry> {
		self.entries
			.iter()
			.find(|entry| entry.matcher.is_match(topic))
	}

	pub fn entries(&self) -> &[SubscriberEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Distinct wire topics with their QoS, in registration order.
	pub fn wire_topics(&self) -> Vec<(ArcStr, QoS)> {
		let mut seen = HashSet::new();
		self.entries
			.iter()
			.filter(|entry| seen.insert(entry.topic.clone()))
			.map(|entry| (entry.topic.clone(), entry.descriptor.requested_qos()))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::{HandlerArgs, HandlerResult};
	use crate::transport::mock::MockTransport;

	async fn noop(_args: HandlerArgs) -> HandlerResult {
		Ok(())
	}

	fn registration(owner: &str, topic: &str) -> HandlerRegistration {
		HandlerRegistration::new(owner, topic, [], Arc::new(noop))
	}

	#[tokio::test]
	async fn test_first_registered_match_wins() {
		let transport = MockTransport::new();
		let mut registry = SubscriptionRegistry::default();
		registry
			.register(transport.as_ref(), registration("wildcard", "a/+"))
			.await;
		registry
			.register(transport.as_ref(), registration("exact", "a/b"))
			.await;

		assert_eq!(registry.lookup("a/b").unwrap().owner(), "wildcard");
		assert_eq!(registry.lookup("a/c").unwrap().owner(), "wildcard");
		assert!(registry.lookup("b/c").is_none());
	}

	#[tokio::test]
	async fn test_duplicate_patterns_are_not_merged() {
		let transport = MockTransport::new();
		let mut registry = SubscriptionRegistry::default();
		registry
			.register(transport.as_ref(), registration("first", "x/y"))
			.await;
		registry
			.register(transport.as_ref(), registration("second", "x/y"))
			.await;

		assert_eq!(registry.len(), 2);
		assert_eq!(transport.subscribed(), ["x/y", "x/y"]);
		assert_eq!(registry.wire_topics().len(), 1);
	}

	#[tokio::test]
	async fn test_rejected_topic_does_not_block_siblings() {
		let transport = MockTransport::new();
		transport.reject("bad/topic");
		let mut registry = SubscriptionRegistry::default();

		let multi = HandlerRegistration::new(
			"multi",
			SubscriptionDescriptor::with_topics(["bad/topic", "good/+"]),
			[],
			Arc::new(noop),
		);
		assert_eq!(registry.register(transport.as_ref(), multi).await, 1);
		registry
			.register(transport.as_ref(), registration("next", "other/#"))
			.await;

		let routes: Vec<&str> =
			registry.entries().iter().map(|e| e.route().as_str()).collect();
		assert_eq!(routes, ["good/+", "other/#"]);
	}

	#[tokio::test]
	async fn test_namespaced_entry_routes_on_canonical_topic() {
		let transport = MockTransport::new();
		let preprocessor =
			TopicPreprocessor::new().with_share(Some(ArcStr::from("workers")));
		let mut registry = SubscriptionRegistry::new(preprocessor);

		let queued = HandlerRegistration::new(
			"jobs",
			SubscriptionDescriptor::new("jobs/+").queue(true),
			[],
			Arc::new(noop),
		);
		registry.register(transport.as_ref(), queued).await;
		registry
			.register(transport.as_ref(), registration("events", "events/#"))
			.await;

		assert_eq!(
			transport.subscribed(),
			["$queue/jobs/+", "$share/workers/events/#"]
		);
		let entry = registry.lookup("jobs/7").unwrap();
		assert_eq!(entry.topic(), "$queue/jobs/+");
		assert_eq!(entry.route(), "jobs/+");
		assert_eq!(registry.lookup("events/a/b").unwrap().owner(), "events");
	}

	#[tokio::test]
	async fn test_out_of_range_argument_index_is_rejected() {
		let transport = MockTransport::new();
		let mut registry = SubscriptionRegistry::default();

		for index in [MAX_HANDLER_ARGUMENTS, usize::MAX] {
			let oversized = HandlerRegistration::new(
				"oversized",
				"x/+",
				[ParameterBinding::payload(0), ParameterBinding::topic(index)],
				Arc::new(noop),
			);
			assert_eq!(registry.register(transport.as_ref(), oversized).await, 0);
		}
		let widest = HandlerRegistration::new(
			"widest",
			"x/+",
			[ParameterBinding::topic(MAX_HANDLER_ARGUMENTS - 1)],
			Arc::new(noop),
		);
		assert_eq!(registry.register(transport.as_ref(), widest).await, 1);

		assert_eq!(transport.subscribed(), ["x/+"]);
		assert_eq!(registry.lookup("x/1").unwrap().owner(), "widest");
	}
}
