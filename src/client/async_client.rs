use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use arcstr::ArcStr;
use rumqttc::{AsyncClient, QoS};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time;
use tracing::{debug, info, warn};

use super::config::MqttClientConfig;
use super::error::MqttClientError;
use super::publisher::MqttPublisher;
use crate::connection::kernel::{Backoff, ConnectionKernel, KernelContext};
use crate::connection::{ConnectionError, ConnectionState, MqttConnection};
use crate::message_transform::OutboundPayload;
use crate::routing::handler::discover;
use crate::routing::{
	Dispatcher, MessageRouter, SubscriberEntry, SubscriptionError,
	SubscriptionRegistry,
};
use crate::topic::validation;
use crate::transport::{
	EventSource, PublishOptions, RumqttcEventSource, Transport,
};

/// Connected client facade.
///
/// Cheap to clone; all clones share the transport and the registry built
/// at connect time.
#[derive(Clone)]
pub struct MqttClient {
	transport: Arc<dyn Transport>,
	registry: Arc<SubscriptionRegistry>,
}

impl MqttClient {
	/// Connects to the broker at `url` and registers the router's handlers.
	pub async fn connect(
		url: &str,
		router: MessageRouter,
	) -> Result<(Self, MqttConnection), MqttClientError> {
		let config = MqttClientConfig::from_url(url)?;
		Self::connect_with_config(config, router).await
	}

	/// Connects with a full configuration.
	pub async fn connect_with_config(
		config: MqttClientConfig,
		router: MessageRouter,
	) -> Result<(Self, MqttConnection), MqttClientError> {
		config.settings.validate()?;
		let (client, event_loop) = AsyncClient::new(
			config.connection.clone(),
			config.settings.event_loop_capacity,
		);
		let events = RumqttcEventSource::new(event_loop);
		Self::connect_with_transport(config, router, Arc::new(client), events)
			.await
	}

	/// Connects over an arbitrary transport.
	///
	/// 1. Runs the handshake, bounded by the connection timeout
	/// 2. Starts the event loop and dispatcher tasks; messages received
	///    before the registry is ready wait in a bounded backlog
	/// 3. Registers every router handler, then component methods when
	///    `auto_subscribe` is set
	/// 4. Hands the registry to the dispatcher, which first dispatches the
	///    backlog
	pub async fn connect_with_transport<E: EventSource>(
		config: MqttClientConfig,
		router: MessageRouter,
		transport: Arc<dyn Transport>,
		events: E,
	) -> Result<(Self, MqttConnection), MqttClientError> {
		config.settings.validate()?;
		let (inbound_tx, inbound_rx) =
			mpsc::channel(config.settings.inbound_channel_capacity);
		let state = Arc::new(watch::channel(ConnectionState::Disconnected).0);
		let shutdown = Arc::new(AtomicBool::new(false));
		let registry_slot = Arc::new(OnceLock::new());
		let (initial, max) = config.settings.reconnect_delays();

		let mut kernel = ConnectionKernel::new(events, KernelContext {
			transport: transport.clone(),
			inbound: inbound_tx,
			state: state.clone(),
			shutdown: shutdown.clone(),
			registry: registry_slot.clone(),
			credentials: config.credentials.clone(),
			provider: config.credential_provider.clone(),
			backoff: Backoff { initial, max },
		});

		let timeout = config.settings.connection_timeout();
		let established = match time::timeout(timeout, kernel.establish()).await
		{
			| Ok(result) => result,
			| Err(_) => Err(ConnectionError::Timeout {
				timeout_millis: config.settings.connection_timeout_millis,
			}),
		};
		if let Err(err) = established {
			if let Err(disconnect_err) = transport.disconnect(true).await {
				debug!(error = %disconnect_err, "Disconnect after failed connect");
			}
			return Err(err.into());
		}

		let kernel = tokio::spawn(kernel.run());
		let mut connection = MqttConnection::new(
			transport.clone(),
			shutdown,
			state,
			kernel,
			config.settings.shutdown_timeout(),
		);
		let (ready_tx, ready_rx) = oneshot::channel();
		connection.attach_dispatcher(tokio::spawn(Dispatcher::run_when_ready(
			ready_rx,
			inbound_rx,
			config.settings.inbound_channel_capacity,
		)));

		let mut registry = SubscriptionRegistry::new(config.preprocessor());
		let (registrations, components) = router.into_parts();
		for registration in registrations {
			registry.register(transport.as_ref(), registration).await;
		}
		if config.auto_subscribe {
			for registration in discover(components) {
				registry.register(transport.as_ref(), registration).await;
			}
		} else if !components.is_empty() {
			info!(
				components = components.len(),
				"Auto-subscribe disabled, skipping component subscriptions"
			);
		}
		info!(subscribers = registry.len(), "Subscription registration complete");

		let registry = Arc::new(registry);
		if registry_slot.set(registry.clone()).is_err() {
			warn!("Subscription registry was already initialised");
		}
		let dispatcher = Dispatcher::new(registry.clone(), config.before_handle);
		if ready_tx.send(dispatcher).is_err() {
			warn!("Dispatcher stopped before registration finished");
		}

		Ok((Self { transport, registry }, connection))
	}

	/// Publishes a message. Structured values are sent as UTF-8 JSON.
	pub async fn publish(
		&self,
		topic: &str,
		payload: impl Into<OutboundPayload>,
		options: PublishOptions,
	) -> Result<(), MqttClientError> {
		validation::validate_publish_topic(topic)?;
		let payload = payload.into().into_bytes()?;
		self.transport
			.publish(topic, payload, options)
			.await
			.map_err(|source| MqttClientError::Publish {
				topic: topic.to_string(),
				source,
			})
	}

	/// Serializes `value` as JSON and publishes it.
	pub async fn publish_json<T: Serialize + ?Sized>(
		&self,
		topic: &str,
		value: &T,
		options: PublishOptions,
	) -> Result<(), MqttClientError> {
		self.publish(topic, OutboundPayload::json(value)?, options)
			.await
	}

	/// Sends a raw subscribe request.
	///
	/// The topic is passed through unchanged and no handler is bound:
	/// matching messages reach a handler only if a registered pattern
	/// accepts them.
	pub async fn subscribe(
		&self,
		topic: &str,
		qos: QoS,
	) -> Result<(), MqttClientError> {
		self.transport.subscribe(topic, qos).await.map_err(|source| {
			SubscriptionError {
				topic: ArcStr::from(topic),
				source,
			}
			.into()
		})
	}

	pub async fn unsubscribe(&self, topic: &str) -> Result<(), MqttClientError> {
		self.transport.unsubscribe(topic).await.map_err(|source| {
			MqttClientError::Unsubscribe {
				topic: topic.to_string(),
				source,
			}
		})
	}

	/// Publisher for a fixed topic.
	pub fn get_publisher<T: Serialize>(
		&self,
		topic: impl Into<ArcStr>,
	) -> Result<MqttPublisher<T>, MqttClientError> {
		let topic = topic.into();
		validation::validate_publish_topic(&topic)?;
		Ok(MqttPublisher::new(self.transport.clone(), topic))
	}

	/// Registered subscriber entries, in registration order.
	pub fn subscribers(&self) -> &[SubscriberEntry] {
		self.registry.entries()
	}

	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.registry
	}
}
