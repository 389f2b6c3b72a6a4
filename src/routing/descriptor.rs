use arcstr::ArcStr;
use rumqttc::QoS;
use smallvec::SmallVec;

use crate::message_transform::PayloadTransform;

/// Declared subscription of one handler.
///
/// Topics may carry a `$queue/` or `$share/<group>/` namespace and
/// `${name}` variables; both are resolved by the
/// [`TopicPreprocessor`](crate::topic::TopicPreprocessor) at registration.
#[derive(Debug, Clone)]
pub struct SubscriptionDescriptor {
	topics: SmallVec<[ArcStr; 1]>,
	queue: Option<bool>,
	share: Option<ArcStr>,
	transform: PayloadTransform,
	qos: QoS,
}

impl SubscriptionDescriptor {
	/// Subscription to a single topic pattern.
	pub fn new(topic: impl Into<ArcStr>) -> Self {
		Self::with_topics([topic])
	}

	/// Subscription to several topic patterns sharing one handler.
	pub fn with_topics<I, T>(topics: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<ArcStr>,
	{
		Self {
			topics: topics.into_iter().map(Into::into).collect(),
			queue: None,
			share: None,
			transform: PayloadTransform::default(),
			qos: QoS::AtLeastOnce,
		}
	}

	/// Overrides the module-level queue flag.
	pub fn queue(mut self, queue: bool) -> Self {
		self.queue = Some(queue);
		self
	}

	/// Overrides the module-level share group. An empty group disables
	/// shared subscription for this descriptor.
	pub fn share(mut self, group: impl Into<ArcStr>) -> Self {
		self.share = Some(group.into());
		self
	}

	/// Sets the payload transform (JSON by default).
	pub fn transform(mut self, transform: PayloadTransform) -> Self {
		self.transform = transform;
		self
	}

	/// Sets the QoS requested from the broker.
	pub fn qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	pub fn topics(&self) -> &[ArcStr] {
		&self.topics
	}

	pub fn queue_override(&self) -> Option<bool> {
		self.queue
	}

	pub fn share_override(&self) -> Option<&ArcStr> {
		self.share.as_ref()
	}

	pub fn payload_transform(&self) -> &PayloadTransform {
		&self.transform
	}

	pub fn requested_qos(&self) -> QoS {
		self.qos
	}
}

impl From<&str> for SubscriptionDescriptor {
	fn from(topic: &str) -> Self {
		Self::new(topic)
	}
}

impl From<String> for SubscriptionDescriptor {
	fn from(topic: String) -> Self {
		Self::new(topic)
	}
}

impl From<ArcStr> for SubscriptionDescriptor {
	fn from(topic: ArcStr) -> Self {
		Self::new(topic)
	}
}

/// What a handler argument slot receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
	/// Payload decoded with the subscription's transform
	Payload,
	/// Raw topic string of the message
	Topic,
	/// Raw protocol packet
	Packet,
	/// Ordered wildcard captures
	Params,
}

/// Highest number of positional slots a handler may bind.
pub const MAX_HANDLER_ARGUMENTS: usize = 32;

/// Binds a handler argument index to an extraction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterBinding {
	pub index: usize,
	pub kind: ParameterKind,
}

impl ParameterBinding {
	pub fn new(index: usize, kind: ParameterKind) -> Self {
		Self { index, kind }
	}

	pub fn payload(index: usize) -> Self {
		Self::new(index, ParameterKind::Payload)
	}

	pub fn topic(index: usize) -> Self {
		Self::new(index, ParameterKind::Topic)
	}

	pub fn packet(index: usize) -> Self {
		Self::new(index, ParameterKind::Packet)
	}

	pub fn params(index: usize) -> Self {
		Self::new(index, ParameterKind::Params)
	}
}
