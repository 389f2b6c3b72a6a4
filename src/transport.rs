//! Transport seam between the dispatch core and the MQTT wire client
//!
//! [`Transport`] is the request capability (subscribe, publish, unsubscribe,
//! disconnect) shared by the registry and the client facade. [`EventSource`]
//! is the event stream consumed only by the connection kernel. Both are
//! implemented for `rumqttc` in [`rumqttc_transport`].

use std::sync::Arc;

use arcstr::ArcStr;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{ClientError, Publish, QoS};
use thiserror::Error;

use crate::connection::Credentials;

#[cfg(test)]
pub(crate) mod mock;
/// `rumqttc` backed transport and event source
pub mod rumqttc_transport;

pub use rumqttc_transport::RumqttcEventSource;

/// Failure of a single transport request.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The wire client refused the request
	#[error("MQTT client error: {0}")]
	Client(#[from] ClientError),

	/// The request was rejected for a specific topic
	#[error("{operation} rejected for '{topic}': {reason}")]
	Rejected {
		/// Operation name
		operation: &'static str,
		/// Topic of the request
		topic: String,
		/// Why the request was rejected
		reason: String,
	},

	/// The transport has been shut down
	#[error("Transport is closed")]
	Closed,
}

/// Options forwarded with a publish request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishOptions {
	pub qos: QoS,
	pub retain: bool,
}

impl Default for PublishOptions {
	fn default() -> Self {
		Self {
			qos: QoS::AtLeastOnce,
			retain: false,
		}
	}
}

impl PublishOptions {
	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	pub fn with_retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}
}

/// Request side of the wire client.
///
/// Holders of this capability can issue requests but cannot observe or
/// change connection state.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	async fn subscribe(&self, topic: &str, qos: QoS)
	-> Result<(), TransportError>;

	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;

	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		options: PublishOptions,
	) -> Result<(), TransportError>;

	/// Requests a disconnect. A forced disconnect must not wait for the
	/// outgoing queue to drain.
	async fn disconnect(&self, force: bool) -> Result<(), TransportError>;
}

/// Inbound message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
	pub topic: ArcStr,
	pub payload: Bytes,
	/// Raw protocol packet
	pub packet: Arc<Publish>,
}

impl From<Publish> for InboundMessage {
	fn from(packet: Publish) -> Self {
		Self {
			topic: ArcStr::from(packet.topic.as_str()),
			payload: packet.payload.clone(),
			packet: Arc::new(packet),
		}
	}
}

/// Connection level event observed by the kernel.
#[derive(Debug, Clone)]
pub enum TransportEvent {
	/// Broker accepted the connection
	Connect {
		/// Broker resumed an existing session
		session_present: bool,
	},
	/// A new connection attempt is about to start
	Reconnect,
	/// Connection was closed by either side
	Close,
	/// Connection went offline
	Offline,
	/// Transport error, the next poll retries
	Error(String),
	Message(InboundMessage),
}

/// Event side of the wire client, owned exclusively by the kernel.
#[async_trait]
pub trait EventSource: Send + 'static {
	/// Next event, or `None` when the stream has ended for good.
	async fn next_event(&mut self) -> Option<TransportEvent>;

	/// Credentials used by the next connection attempt.
	fn update_credentials(&mut self, credentials: &Credentials);
}
