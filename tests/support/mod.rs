//! Channel-backed transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use mqtt_topic_dispatch::advanced::{EventSource, Transport, TransportEvent};
use mqtt_topic_dispatch::errors::TransportError;
use mqtt_topic_dispatch::{Credentials, PublishOptions, QoS};
use rumqttc::Publish;
use tokio::sync::mpsc;

/// Records requests; disconnect closes the event stream.
pub struct LoopbackTransport {
	pub subscribed: Mutex<Vec<String>>,
	pub published: Mutex<Vec<(String, Bytes)>>,
	pub disconnects: Mutex<Vec<bool>>,
	events: mpsc::UnboundedSender<TransportEvent>,
}

#[async_trait]
impl Transport for LoopbackTransport {
	async fn subscribe(&self, topic: &str, _qos: QoS) -> Result<(), TransportError> {
		self.subscribed.lock().unwrap().push(topic.to_string());
		Ok(())
	}

	async fn unsubscribe(&self, _topic: &str) -> Result<(), TransportError> {
		Ok(())
	}

	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		_options: PublishOptions,
	) -> Result<(), TransportError> {
		self.published
			.lock()
			.unwrap()
			.push((topic.to_string(), payload));
		Ok(())
	}

	async fn disconnect(&self, force: bool) -> Result<(), TransportError> {
		self.disconnects.lock().unwrap().push(force);
		let _ = self.events.send(TransportEvent::Close);
		Ok(())
	}
}

pub struct ChannelEvents {
	events: mpsc::UnboundedReceiver<TransportEvent>,
	pub credentials: Arc<Mutex<Vec<Credentials>>>,
}

#[async_trait]
impl EventSource for ChannelEvents {
	async fn next_event(&mut self) -> Option<TransportEvent> {
		self.events.recv().await
	}

	fn update_credentials(&mut self, credentials: &Credentials) {
		self.credentials.lock().unwrap().push(credentials.clone());
	}
}

pub struct Broker {
	pub transport: Arc<LoopbackTransport>,
	pub events: ChannelEvents,
	pub sender: mpsc::UnboundedSender<TransportEvent>,
	pub credentials: Arc<Mutex<Vec<Credentials>>>,
}

/// Transport pair whose first event is a successful connect.
pub fn broker() -> Broker {
	let (sender, receiver) = mpsc::unbounded_channel();
	sender
		.send(TransportEvent::Connect {
			session_present: false,
		})
		.unwrap();
	let credentials = Arc::new(Mutex::new(Vec::new()));
	Broker {
		transport: Arc::new(LoopbackTransport {
			subscribed: Mutex::new(Vec::new()),
			published: Mutex::new(Vec::new()),
			disconnects: Mutex::new(Vec::new()),
			events: sender.clone(),
		}),
		events: ChannelEvents {
			events: receiver,
			credentials: credentials.clone(),
		},
		sender,
		credentials,
	}
}

pub fn message(topic: &str, payload: impl Into<Vec<u8>>) -> TransportEvent {
	TransportEvent::Message(
		Publish::new(topic, QoS::AtLeastOnce, payload.into()).into(),
	)
}
