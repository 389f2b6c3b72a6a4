use rumqttc::OptionError;
use thiserror::Error;

use crate::connection::ConnectionError;
use crate::routing::SubscriptionError;
use crate::topic::TopicError;
use crate::transport::TransportError;

/// Errors that can occur in MQTT client operations
#[derive(Debug, Error)]
pub enum MqttClientError {
	/// Transport rejected a request
	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),

	/// Publish request failed
	#[error("Failed to publish to '{topic}': {source}")]
	Publish {
		/// Publish topic
		topic: String,
		/// Transport failure
		#[source]
		source: TransportError,
	},

	/// Unsubscribe request failed
	#[error("Failed to unsubscribe from '{topic}': {source}")]
	Unsubscribe {
		/// Unsubscribed topic
		topic: String,
		/// Transport failure
		#[source]
		source: TransportError,
	},

	/// Subscribe request failed
	#[error(transparent)]
	Subscription(#[from] SubscriptionError),

	/// Serialization errors when converting data to bytes
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Configuration errors when parsing MQTT options
	#[error("Configuration error: {0}")]
	Configuration(#[from] OptionError),

	/// Invalid configuration parameter values
	#[error("Invalid configuration value: {0}")]
	ConfigurationValue(String),

	/// Connection could not be established
	#[error(transparent)]
	Connection(#[from] ConnectionError),

	/// Invalid topic or topic pattern
	#[error(transparent)]
	Topic(#[from] TopicError),
}
