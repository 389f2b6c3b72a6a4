//! In-memory transport used by unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{Publish, QoS};
use tokio::sync::mpsc;

use super::{
	EventSource, InboundMessage, PublishOptions, Transport, TransportError,
	TransportEvent,
};
use crate::connection::Credentials;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
	Subscribe(String, QoS),
	Unsubscribe(String),
	Publish(String, Bytes, PublishOptions),
	Disconnect { force: bool },
}

#[derive(Default)]
pub(crate) struct MockTransport {
	calls: Mutex<Vec<Call>>,
	rejected: Mutex<HashSet<String>>,
	events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl MockTransport {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Transport whose disconnect closes the given event stream.
	pub(crate) fn with_events(
		events: mpsc::UnboundedSender<TransportEvent>,
	) -> Arc<Self> {
		let transport = Self::default();
		*transport.events.lock().unwrap() = Some(events);
		Arc::new(transport)
	}

	pub(crate) fn reject(&self, topic: &str) {
		self.rejected.lock().unwrap().insert(topic.to_string());
	}

	pub(crate) fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	pub(crate) fn subscribed(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				| Call::Subscribe(topic, _) => Some(topic),
				| _ => None,
			})
			.collect()
	}

	fn record(
		&self,
		operation: &'static str,
		topic: &str,
		call: Call,
	) -> Result<(), TransportError> {
		self.calls.lock().unwrap().push(call);
		if self.rejected.lock().unwrap().contains(topic) {
			return Err(TransportError::Rejected {
				operation,
				topic: topic.to_string(),
				reason: "rejected by mock".into(),
			});
		}
		Ok(())
	}
}

#[async_trait]
impl Transport for MockTransport {
	async fn subscribe(
		&self,
		topic: &str,
		qos: QoS,
	) -> Result<(), TransportError> {
		self.record("subscribe", topic, Call::Subscribe(topic.into(), qos))
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
		self.record("unsubscribe", topic, Call::Unsubscribe(topic.into()))
	}

	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		options: PublishOptions,
	) -> Result<(), TransportError> {
		self.record(
			"publish",
			topic,
			Call::Publish(topic.into(), payload, options),
		)
	}

	async fn disconnect(&self, force: bool) -> Result<(), TransportError> {
		self.calls.lock().unwrap().push(Call::Disconnect { force });
		if let Some(events) = self.events.lock().unwrap().as_ref() {
			let _ = events.send(TransportEvent::Close);
		}
		Ok(())
	}
}

/// Event source fed from a channel, recording credential updates.
pub(crate) struct ScriptedEvents {
	events: mpsc::UnboundedReceiver<TransportEvent>,
	credentials: Arc<Mutex<Vec<Credentials>>>,
}

impl ScriptedEvents {
	pub(crate) fn new() -> (
		Self,
		mpsc::UnboundedSender<TransportEvent>,
		Arc<Mutex<Vec<Credentials>>>,
	) {
		let (tx, rx) = mpsc::unbounded_channel();
		let credentials = Arc::new(Mutex::new(Vec::new()));
		let source = Self {
			events: rx,
			credentials: credentials.clone(),
		};
		(source, tx, credentials)
	}
}

#[async_trait]
impl EventSource for ScriptedEvents {
	async fn next_event(&mut self) -> Option<TransportEvent> {
		self.events.recv().await
	}

	fn update_credentials(&mut self, credentials: &Credentials) {
		self.credentials.lock().unwrap().push(credentials.clone());
	}
}

pub(crate) fn message(topic: &str, payload: &[u8]) -> InboundMessage {
	Publish::new(topic, QoS::AtLeastOnce, payload.to_vec()).into()
}
