use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, error, info, warn};

use super::credentials::{CredentialProvider, Credentials};
use super::error::ConnectionError;
use super::state::ConnectionState;
use crate::routing::SubscriptionRegistry;
use crate::transport::{EventSource, InboundMessage, Transport, TransportEvent};

/// Exponential retry delay: `initial * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Backoff {
	pub initial: Duration,
	pub max: Duration,
}

impl Backoff {
	pub fn delay(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1).min(16);
		self.initial
			.saturating_mul(2_u32.pow(exponent))
			.min(self.max)
	}
}

/// Everything the kernel needs besides the event source itself.
pub(crate) struct KernelContext {
	pub transport: Arc<dyn Transport>,
	pub inbound: mpsc::Sender<InboundMessage>,
	pub state: Arc<watch::Sender<ConnectionState>>,
	pub shutdown: Arc<AtomicBool>,
	pub registry: Arc<OnceLock<Arc<SubscriptionRegistry>>>,
	pub credentials: Option<Credentials>,
	pub provider: Option<Arc<dyn CredentialProvider>>,
	pub backoff: Backoff,
}

/// Owns the event source and the connection state.
///
/// Transport events drive every state transition. Inbound messages are
/// forwarded to the dispatcher queue; when the queue is full the kernel
/// waits, which stops the event source from being polled.
pub(crate) struct ConnectionKernel<E> {
	events: E,
	ctx: KernelContext,
	error_count: u32,
	reconnecting: bool,
}

impl<E: EventSource> ConnectionKernel<E> {
	pub fn new(events: E, ctx: KernelContext) -> Self {
		Self {
			events,
			ctx,
			error_count: 0,
			reconnecting: false,
		}
	}

	fn set_state(&self, state: ConnectionState) {
		let previous = self.ctx.state.send_replace(state);
		if previous != state {
			debug!(from = %previous, to = %state, "Connection state changed");
		}
	}

	fn shutdown_requested(&self) -> bool {
		self.ctx.shutdown.load(Ordering::Acquire)
	}

	/// Runs the handshake until the broker accepts the connection.
	///
	/// Messages that arrive before the acknowledgment (resumed sessions) are
	/// queued for the dispatcher.
	pub async fn establish(&mut self) -> Result<(), ConnectionError> {
		self.set_state(ConnectionState::Connecting);
		self.refresh_credentials().await;

		loop {
			let Some(event) = self.events.next_event().await else {
				self.set_state(ConnectionState::Disconnected);
				return Err(ConnectionError::EventStreamEnded);
			};
			match event {
				| TransportEvent::Connect { session_present } => {
					info!(session_present, "Connected to MQTT broker");
					self.set_state(ConnectionState::Connected);
					return Ok(());
				}
				| TransportEvent::Error(reason) => {
					error!(error = %reason, "MQTT connection failed");
					self.set_state(ConnectionState::Disconnected);
					return Err(ConnectionError::Network(reason));
				}
				| TransportEvent::Close => {
					self.set_state(ConnectionState::Disconnected);
					return Err(ConnectionError::Closed);
				}
				| TransportEvent::Message(message) => {
					Self::forward(&self.ctx.inbound, message).await;
				}
				| event @ (TransportEvent::Reconnect | TransportEvent::Offline) => {
					debug!(event = ?event, "Ignoring event before first connect");
				}
			}
		}
	}

	/// Processes events until shutdown or until the event stream ends.
	pub async fn run(mut self) {
		while let Some(event) = self.events.next_event().await {
			match event {
				| TransportEvent::Connect { session_present } => {
					self.error_count = 0;
					self.set_state(ConnectionState::Connected);
					info!(session_present, "Connected to MQTT broker");
					if std::mem::take(&mut self.reconnecting) && !session_present {
						self.resubscribe();
					}
				}
				| TransportEvent::Reconnect => {
					if self.shutdown_requested() {
						continue;
					}
					info!("Reconnecting to MQTT broker");
					self.reconnecting = true;
					self.set_state(ConnectionState::Reconnecting);
					self.refresh_credentials().await;
				}
				| TransportEvent::Close => {
					if self.shutdown_requested() {
						info!("MQTT connection closed");
						break;
					}
					warn!("MQTT connection closed by broker, waiting for reconnect");
					self.set_state(ConnectionState::Reconnecting);
				}
				| TransportEvent::Offline => {
					warn!("MQTT connection offline");
					if !self.shutdown_requested() {
						self.set_state(ConnectionState::Reconnecting);
					}
				}
				| TransportEvent::Error(reason) => {
					if self.shutdown_requested() {
						debug!(error = %reason, "Transport error during shutdown");
						break;
					}
					self.error_count = self.error_count.saturating_add(1);
					let delay = self.ctx.backoff.delay(self.error_count);
					error!(
						error_count = self.error_count,
						error = %reason,
						"MQTT event loop error"
					);
					warn!(delay = ?delay, "Retrying MQTT connection");
					time::sleep(delay).await;
				}
				| TransportEvent::Message(message) => {
					self.error_count = 0;
					Self::forward(&self.ctx.inbound, message).await;
				}
			}
		}
		self.set_state(ConnectionState::Disconnected);
		info!("MQTT event loop terminated");
	}

	async fn forward(
		inbound: &mpsc::Sender<InboundMessage>,
		message: InboundMessage,
	) {
		debug!(
			topic = %message.topic,
			payload_size = message.payload.len(),
			"Received MQTT message"
		);
		if let Err(err) = inbound.send(message).await {
			debug!(topic = %err.0.topic, "Dispatcher gone, dropping message");
		}
	}

	/// Queries the provider (or falls back to static credentials) and hands
	/// the result to the event source before the next connection attempt.
	async fn refresh_credentials(&mut self) {
		if let Some(provider) = &self.ctx.provider {
			match provider.credentials().await {
				| Ok(credentials) => {
					debug!("Credential provider returned fresh credentials");
					self.ctx.credentials = Some(credentials);
				}
				| Err(err) => {
					error!(
						error = %err,
						"Credential refresh failed, keeping previous credentials"
					);
				}
			}
		}
		if let Some(credentials) = &self.ctx.credentials {
			self.events.update_credentials(credentials);
		}
	}

	/// Re-issues every registered subscription after the broker lost the
	/// session. Runs in its own task so the event source keeps being polled.
	fn resubscribe(&self) {
		let Some(registry) = self.ctx.registry.get().cloned() else {
			return;
		};
		let transport = self.ctx.transport.clone();
		tokio::spawn(async move {
			let topics = registry.wire_topics();
			info!(count = topics.len(), "Restoring subscriptions");
			for (topic, qos) in topics {
				if let Err(err) = transport.subscribe(&topic, qos).await {
					warn!(topic = %topic, error = %err, "Failed to restore subscription");
				}
			}
		});
	}
}
