//! Configuration for MQTT client initialization

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use bytes::Bytes;
use rumqttc::{MqttOptions, OptionError, Publish};

use super::error::MqttClientError;
use crate::BoxError;
use crate::connection::{CredentialProvider, Credentials};
use crate::routing::PreHandleHook;
use crate::topic::{TopicPreprocessor, TopicResolver};

/// Client-level performance and behavior settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
	/// Capacity of the `rumqttc` request channel
	pub event_loop_capacity: usize,
	/// Capacity of the queue between the event loop and the dispatcher.
	///
	/// When full, the event loop stops polling until the dispatcher catches
	/// up. Also bounds the backlog held while subscriptions are registered;
	/// beyond it the oldest waiting messages are dropped.
	pub inbound_channel_capacity: usize,
	/// Time allowed for the broker to accept the first connection
	pub connection_timeout_millis: u64,
	/// Time allowed for each shutdown step before forcing it
	pub shutdown_timeout_millis: u64,
	/// First retry delay after a transport error
	pub reconnect_initial_delay_millis: u64,
	/// Upper bound of the retry delay
	pub reconnect_max_delay_millis: u64,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			event_loop_capacity: 10,
			inbound_channel_capacity: 1000,
			connection_timeout_millis: 10_000,
			shutdown_timeout_millis: 5_000,
			reconnect_initial_delay_millis: 100,
			reconnect_max_delay_millis: 30_000,
		}
	}
}

impl ClientSettings {
	/// Rejects settings the client cannot run with.
	pub fn validate(&self) -> Result<(), MqttClientError> {
		if self.event_loop_capacity == 0 {
			return Err(MqttClientError::ConfigurationValue(
				"event_loop_capacity must be greater than 0".into(),
			));
		}
		if self.inbound_channel_capacity == 0 {
			return Err(MqttClientError::ConfigurationValue(
				"inbound_channel_capacity must be greater than 0".into(),
			));
		}
		if self.reconnect_initial_delay_millis > self.reconnect_max_delay_millis
		{
			return Err(MqttClientError::ConfigurationValue(format!(
				"reconnect_initial_delay_millis ({}) exceeds \
				 reconnect_max_delay_millis ({})",
				self.reconnect_initial_delay_millis,
				self.reconnect_max_delay_millis
			)));
		}
		Ok(())
	}

	pub(crate) fn connection_timeout(&self) -> Duration {
		Duration::from_millis(self.connection_timeout_millis)
	}

	pub(crate) fn shutdown_timeout(&self) -> Duration {
		Duration::from_millis(self.shutdown_timeout_millis)
	}

	pub(crate) fn reconnect_delays(&self) -> (Duration, Duration) {
		(
			Duration::from_millis(self.reconnect_initial_delay_millis),
			Duration::from_millis(self.reconnect_max_delay_millis),
		)
	}
}

/// Configuration for MQTT client creation
#[derive(Clone)]
pub struct MqttClientConfig {
	/// Underlying MQTT connection options (from rumqttc)
	pub connection: MqttOptions,
	/// Client-level performance and behavior settings
	pub settings: ClientSettings,
	/// Static credentials, used when no provider is set or it fails
	pub credentials: Option<Credentials>,
	/// Provider queried at connect and before every reconnect
	pub credential_provider: Option<Arc<dyn CredentialProvider>>,
	/// Default queue flag for subscriptions
	pub queue: bool,
	/// Default share group for subscriptions
	pub share: Option<ArcStr>,
	/// Resolver for `${name}` topic variables
	pub topic_resolver: Option<TopicResolver>,
	/// Hook run before every handler
	pub before_handle: Option<PreHandleHook>,
	/// Register component methods after connecting
	pub auto_subscribe: bool,
}

impl MqttClientConfig {
	/// Create new config with common defaults
	///
	/// # Arguments
	/// * `client_id` - Unique identifier for this MQTT client
	/// * `host` - MQTT broker hostname or IP address
	/// * `port` - MQTT broker port number
	///
	/// # Example
	/// ```rust
	/// use mqtt_topic_dispatch::MqttClientConfig;
	///
	/// let config = MqttClientConfig::new("my_client", "broker.hivemq.com", 1883)
	/// 	.with_share("workers");
	/// ```
	pub fn new(client_id: &str, host: &str, port: u16) -> Self {
		let mut connection = MqttOptions::new(client_id, host, port);
		connection.set_keep_alive(Duration::from_secs(10));
		Self::with_options(connection)
	}

	/// Parse configuration from URL string
	///
	/// Supports URLs with protocols: tcp://, mqtt://, ssl://, mqtts://, ws://, wss://
	///
	/// # Example
	/// ```rust
	/// use mqtt_topic_dispatch::MqttClientConfig;
	///
	/// let config = MqttClientConfig::from_url("mqtt://localhost:1883?client_id=my_client")?;
	/// # Ok::<(), rumqttc::OptionError>(())
	/// ```
	pub fn from_url(url: &str) -> Result<Self, OptionError> {
		Ok(Self::with_options(MqttOptions::parse_url(url)?))
	}

	/// Convenience method for localhost development
	pub fn localhost(client_id: &str) -> Self {
		Self::new(client_id, "localhost", 1883)
	}

	fn with_options(connection: MqttOptions) -> Self {
		Self {
			connection,
			settings: ClientSettings::default(),
			credentials: None,
			credential_provider: None,
			queue: false,
			share: None,
			topic_resolver: None,
			before_handle: None,
			auto_subscribe: true,
		}
	}

	pub fn with_settings(mut self, settings: ClientSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn with_credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Some(credentials);
		self
	}

	/// Sets a provider re-invoked at connect and every reconnect.
	pub fn with_credential_provider(
		mut self,
		provider: impl CredentialProvider,
	) -> Self {
		self.credential_provider = Some(Arc::new(provider));
		self
	}

	/// Subscribes through `$queue/` unless a subscription opts out.
	pub fn with_queue(mut self, queue: bool) -> Self {
		self.queue = queue;
		self
	}

	/// Subscribes through `$share/<group>/` unless a subscription overrides
	/// the group. Ignored for subscriptions using the queue namespace.
	pub fn with_share(mut self, group: impl Into<ArcStr>) -> Self {
		self.share = Some(group.into());
		self
	}

	/// Resolves `${name}` variables in topic patterns before subscribing.
	pub fn with_topic_resolver<F>(mut self, resolver: F) -> Self
	where F: Fn(&str) -> String + Send + Sync + 'static {
		self.topic_resolver = Some(Arc::new(resolver));
		self
	}

	/// Runs `hook` with the raw topic, payload and packet before every
	/// handler. An error drops the message.
	pub fn with_before_handle<F>(mut self, hook: F) -> Self
	where F: Fn(&str, &Bytes, &Publish) -> Result<(), BoxError>
			+ Send
			+ Sync
			+ 'static {
		self.before_handle = Some(Arc::new(hook));
		self
	}

	pub fn with_auto_subscribe(mut self, auto_subscribe: bool) -> Self {
		self.auto_subscribe = auto_subscribe;
		self
	}

	pub(crate) fn preprocessor(&self) -> TopicPreprocessor {
		TopicPreprocessor::new()
			.with_queue(self.queue)
			.with_share(self.share.clone())
			.with_resolver(self.topic_resolver.clone())
	}
}

impl fmt::Debug for MqttClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MqttClientConfig")
			.field("connection", &self.connection)
			.field("settings", &self.settings)
			.field("credentials", &self.credentials)
			.field("credential_provider", &self.credential_provider.is_some())
			.field("queue", &self.queue)
			.field("share", &self.share)
			.field("topic_resolver", &self.topic_resolver.is_some())
			.field("before_handle", &self.before_handle.is_some())
			.field("auto_subscribe", &self.auto_subscribe)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::SubscriptionDescriptor;

	#[test]
	fn test_preprocessor_carries_module_defaults() {
		let config = MqttClientConfig::localhost("test")
			.with_share("workers")
			.with_topic_resolver(|name| format!("<{name}>"));
		let preprocessor = config.preprocessor();

		let topics =
			preprocessor.preprocess(&SubscriptionDescriptor::new("site/${id}/+"));
		assert_eq!(topics, ["$share/workers/site/<id>/+"]);
	}

	#[test]
	fn test_settings_validation() {
		assert!(ClientSettings::default().validate().is_ok());

		let settings = ClientSettings {
			inbound_channel_capacity: 0,
			..ClientSettings::default()
		};
		assert!(matches!(
			settings.validate(),
			Err(MqttClientError::ConfigurationValue(_))
		));

		let settings = ClientSettings {
			reconnect_initial_delay_millis: 60_000,
			..ClientSettings::default()
		};
		assert!(settings.validate().is_err());
	}
}
