//! # MQTT Topic Dispatch
//!
//! Routes MQTT messages to handlers registered against topic patterns.
//!
//! ## Features
//!
//! - **Pattern matching**: `+` and trailing `#` wildcards with ordered captures
//! - **Namespaces**: `$queue/` and `$share/<group>/` subscriptions with
//!   module defaults and per-subscription overrides
//! - **Topic variables**: `${name}` tokens resolved at registration time
//! - **First match wins**: every message reaches exactly one handler, the
//!   earliest registered one whose pattern accepts the topic
//! - **Isolated failures**: decode errors, handler errors and panics are
//!   logged and never stop delivery
//! - **Credential rotation**: an async provider is queried at connect and
//!   before every reconnect
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqtt_topic_dispatch::prelude::*;
//!
//! async fn on_reading(args: HandlerArgs) -> HandlerResult {
//!     let sensor: String = args.param(0, 0)?;
//!     let reading: serde_json::Value = args.json(1)?;
//!     println!("{sensor}: {reading}");
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let mut router = MessageRouter::new();
//!     router.register(
//!         "sensors/+/reading",
//!         [ParameterBinding::params(0), ParameterBinding::payload(1)],
//!         on_reading,
//!     );
//!
//!     let (client, mut connection) =
//!         MqttClient::connect("mqtt://localhost:1883?client_id=demo", router)
//!             .await?;
//!
//!     client
//!         .publish(
//!             "sensors/t1/reading",
//!             serde_json::json!({"value": 21.5}),
//!             PublishOptions::default(),
//!         )
//!         .await?;
//!
//!     connection.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

// Core modules
pub mod client;
pub mod connection;
/// Payload decoding and encoding
pub mod message_transform;
pub mod routing;
pub mod topic;
pub mod transport;

/// Boxed error returned by handlers, hooks and custom transforms
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// === Core Public API ===
pub use client::{MqttClient, MqttClientConfig, MqttClientError};
pub use connection::{
	ConnectionState, CredentialError, CredentialProvider, Credentials,
	MqttConnection,
};
pub use message_transform::{OutboundPayload, Payload, PayloadTransform};
pub use routing::{
	Component, HandlerArgs, HandlerResult, MessageHandler, MessageRouter,
	ParameterBinding, ParameterKind, SubscriptionDescriptor, SubscriptionMethod,
};
pub use transport::PublishOptions;

// Essential external types
pub use rumqttc::QoS;

/// Result type alias for operations that may fail with MqttClientError
pub type Result<T> = std::result::Result<T, MqttClientError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_topic_dispatch::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most MQTT applications

	pub use crate::{
		Component, Credentials, HandlerArgs, HandlerResult, MessageRouter,
		MqttClient, MqttClientConfig, MqttClientError, MqttConnection,
		ParameterBinding, PayloadTransform, PublishOptions, QoS, Result,
		SubscriptionDescriptor, SubscriptionMethod,
	};
}

/// Advanced types for custom transports and manual routing
///
/// ```rust
/// use mqtt_topic_dispatch::advanced::*;
/// ```
pub mod advanced {
	//! Advanced types for complex use cases

	pub use crate::client::{ClientSettings, MqttPublisher};
	pub use crate::routing::{
		Dispatched, Dispatcher, HandlerArg, HandlerRegistration,
		PreHandleHook, SubscriberEntry, SubscriptionRegistry,
	};
	pub use crate::topic::{
		TopicMatch, TopicMatcher, TopicPreprocessor, TopicResolver, limits,
		strip_namespace, validation,
	};
	pub use crate::transport::{
		EventSource, InboundMessage, RumqttcEventSource, Transport,
		TransportEvent,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_topic_dispatch::errors::*;
/// ```
pub mod errors {
	//! All error types used in the library

	pub use crate::connection::{ConnectionError, CredentialError};
	pub use crate::message_transform::DecodeError;
	pub use crate::routing::{ArgumentError, DispatchError, SubscriptionError};
	pub use crate::topic::{TopicError, TopicPatternError};
	pub use crate::transport::TransportError;
	pub use crate::{BoxError, MqttClientError};
}
