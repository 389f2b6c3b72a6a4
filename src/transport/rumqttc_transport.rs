use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{
	AsyncClient, ConnectReturnCode, Event, EventLoop, Outgoing, Packet, QoS,
};
use tracing::{debug, info, trace, warn};

use super::{
	EventSource, PublishOptions, Transport, TransportError, TransportEvent,
};
use crate::connection::Credentials;

#[async_trait]
impl Transport for AsyncClient {
	async fn subscribe(
		&self,
		topic: &str,
		qos: QoS,
	) -> Result<(), TransportError> {
		AsyncClient::subscribe(self, topic, qos).await?;
		Ok(())
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
		AsyncClient::unsubscribe(self, topic).await?;
		Ok(())
	}

	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		options: PublishOptions,
	) -> Result<(), TransportError> {
		self.publish_bytes(topic, options.qos, options.retain, payload)
			.await?;
		Ok(())
	}

	async fn disconnect(&self, force: bool) -> Result<(), TransportError> {
		if force {
			self.try_disconnect()?;
		} else {
			AsyncClient::disconnect(self).await?;
		}
		Ok(())
	}
}

/// Turns `rumqttc` event loop notifications into [`TransportEvent`]s.
///
/// Polling the event loop after an error makes `rumqttc` open a new
/// connection, so every error after the first successful connect is
/// followed by [`TransportEvent::Reconnect`].
pub struct RumqttcEventSource {
	event_loop: EventLoop,
	pending: VecDeque<TransportEvent>,
	connected_once: bool,
	online: bool,
}

impl RumqttcEventSource {
	pub fn new(event_loop: EventLoop) -> Self {
		Self {
			event_loop,
			pending: VecDeque::new(),
			connected_once: false,
			online: false,
		}
	}

	fn map_event(&mut self, event: Event) -> Option<TransportEvent> {
		match event {
			| Event::Incoming(Packet::ConnAck(ack)) => {
				if ack.code == ConnectReturnCode::Success {
					self.connected_once = true;
					self.online = true;
					Some(TransportEvent::Connect {
						session_present: ack.session_present,
					})
				} else {
					Some(TransportEvent::Error(format!(
						"Broker rejected connection: {:?}",
						ack.code
					)))
				}
			}
			| Event::Incoming(Packet::Publish(publish)) => {
				Some(TransportEvent::Message(publish.into()))
			}
			| Event::Incoming(Packet::Disconnect) => {
				info!("Received MQTT Disconnect packet from server");
				self.online = false;
				Some(TransportEvent::Close)
			}
			| Event::Outgoing(Outgoing::Disconnect) => {
				debug!("Sent MQTT Disconnect packet to server");
				self.online = false;
				Some(TransportEvent::Close)
			}
			| notification => {
				trace!(notification = ?notification, "MQTT notification");
				None
			}
		}
	}
}

#[async_trait]
impl EventSource for RumqttcEventSource {
	async fn next_event(&mut self) -> Option<TransportEvent> {
		if let Some(event) = self.pending.pop_front() {
			return Some(event);
		}
		loop {
			match self.event_loop.poll().await {
				| Ok(event) => {
					if let Some(event) = self.map_event(event) {
						return Some(event);
					}
				}
				| Err(err) => {
					if self.online {
						self.online = false;
						self.pending.push_back(TransportEvent::Offline);
					}
					if self.connected_once {
						self.pending.push_back(TransportEvent::Reconnect);
					}
					return Some(TransportEvent::Error(err.to_string()));
				}
			}
		}
	}

	fn update_credentials(&mut self, credentials: &Credentials) {
		let options = &mut self.event_loop.mqtt_options;
		match &credentials.password {
			| Some(password) => {
				options.set_credentials(&credentials.username, password);
			}
			| None => {
				if credentials.username.is_empty() {
					warn!("Ignoring credentials with an empty username");
					return;
				}
				options.set_credentials(&credentials.username, "");
			}
		}
		debug!(username = %credentials.username, "Updated connection credentials");
	}
}
