//! MQTT client module
//!
//! This module provides the client facade: connecting with a handler
//! router, publishing, raw subscribe/unsubscribe and typed publishers.

/// Asynchronous MQTT client implementation
pub mod async_client;
pub mod config;
/// Client error types
pub mod error;
/// Typed MQTT publishers
pub mod publisher;

// Re-export commonly used types for convenience
pub use async_client::MqttClient;
pub use config::{ClientSettings, MqttClientConfig};
pub use error::MqttClientError;
pub use publisher::MqttPublisher;

// Connection type is available from the root level
// Use: mqtt_topic_dispatch::MqttConnection
