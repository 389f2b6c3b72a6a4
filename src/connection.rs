//! Connection lifecycle
//!
//! The connection kernel owns the transport event stream and the
//! connection state. It refreshes credentials before every reconnect,
//! restores subscriptions when the broker lost the session and forwards
//! inbound messages to the dispatcher. [`MqttConnection`] is the handle
//! used to observe the state and to shut everything down.

/// Credentials and the provider trait
pub mod credentials;
pub mod error;
pub(crate) mod kernel;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use credentials::{CredentialError, CredentialProvider, Credentials};
pub use error::ConnectionError;
pub use state::ConnectionState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::transport::Transport;

/// Handle to the running connection and dispatcher tasks.
///
/// Call [`shutdown`](Self::shutdown) before dropping.
pub struct MqttConnection {
	transport: Option<Arc<dyn Transport>>,
	shutdown: Arc<AtomicBool>,
	kernel: Option<JoinHandle<()>>,
	dispatcher: Option<JoinHandle<()>>,
	state: Arc<watch::Sender<ConnectionState>>,
	shutdown_timeout: Duration,
}

impl MqttConnection {
	pub(crate) fn new(
		transport: Arc<dyn Transport>,
		shutdown: Arc<AtomicBool>,
		state: Arc<watch::Sender<ConnectionState>>,
		kernel: JoinHandle<()>,
		shutdown_timeout: Duration,
	) -> Self {
		Self {
			transport: Some(transport),
			shutdown,
			kernel: Some(kernel),
			dispatcher: None,
			state,
			shutdown_timeout,
		}
	}

	pub(crate) fn attach_dispatcher(&mut self, dispatcher: JoinHandle<()>) {
		self.dispatcher = Some(dispatcher);
	}

	/// Current connection state.
	pub fn state(&self) -> ConnectionState {
		*self.state.borrow()
	}

	/// Receiver notified on every state change.
	pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
		self.state.subscribe()
	}

	/// Shuts the connection down.
	///
	/// 1. Sends a graceful disconnect, which ends the event loop
	/// 2. Waits for the event loop; on timeout forces the disconnect and
	///    aborts the task
	/// 3. Waits for the dispatcher to drain the messages already received
	///
	/// Calling it again is a no-op.
	pub async fn shutdown(&mut self) {
		let Some(transport) = self.transport.take() else {
			debug!("Connection already shut down");
			return;
		};
		self.shutdown.store(true, Ordering::Release);

		if let Err(err) = transport.disconnect(false).await {
			warn!(error = %err, "Graceful disconnect failed, forcing");
			if let Err(err) = transport.disconnect(true).await {
				warn!(error = %err, "Forced disconnect failed");
			}
		}

		if let Some(mut kernel) = self.kernel.take() {
			match time::timeout(self.shutdown_timeout, &mut kernel).await {
				| Ok(Ok(())) => {}
				| Ok(Err(err)) => warn!(error = %err, "Event loop task failed"),
				| Err(_) => {
					warn!(
						timeout = ?self.shutdown_timeout,
						"Event loop did not stop in time, forcing disconnect"
					);
					if let Err(err) = transport.disconnect(true).await {
						warn!(error = %err, "Forced disconnect failed");
					}
					kernel.abort();
				}
			}
		}

		if let Some(mut dispatcher) = self.dispatcher.take() {
			match time::timeout(self.shutdown_timeout, &mut dispatcher).await {
				| Ok(Ok(())) => {}
				| Ok(Err(err)) => warn!(error = %err, "Dispatcher task failed"),
				| Err(_) => {
					warn!("Dispatcher did not drain in time, aborting");
					dispatcher.abort();
				}
			}
		}

		self.state.send_replace(ConnectionState::Disconnected);
		info!("MQTT connection shut down");
	}
}

impl Drop for MqttConnection {
	fn drop(&mut self) {
		if self.transport.is_some() {
			error!(
				"MqttConnection dropped without calling shutdown(). Please \
				 call shutdown() and await its completion before dropping."
			);
			self.shutdown.store(true, Ordering::Release);
			if let Some(kernel) = self.kernel.take() {
				kernel.abort();
			}
		}
	}
}
