use std::marker::PhantomData;
use std::sync::Arc;

use arcstr::ArcStr;
use bytes::Bytes;
use rumqttc::QoS;
use serde::Serialize;

use super::error::MqttClientError;
use crate::message_transform::OutboundPayload;
use crate::transport::{PublishOptions, Transport};

/// Publisher bound to one topic, serializing `T` as JSON.
pub struct MqttPublisher<T> {
	transport: Arc<dyn Transport>,
	topic: ArcStr,
	options: PublishOptions,
	_phantom: PhantomData<fn(&T)>,
}

impl<T> Clone for MqttPublisher<T> {
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			topic: self.topic.clone(),
			options: self.options,
			_phantom: PhantomData,
		}
	}
}

impl<T: Serialize> MqttPublisher<T> {
	pub(crate) fn new(transport: Arc<dyn Transport>, topic: ArcStr) -> Self {
		Self {
			transport,
			topic,
			options: PublishOptions::default(),
			_phantom: PhantomData,
		}
	}

	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.options.qos = qos;
		self
	}

	pub fn with_retain(mut self, retain: bool) -> Self {
		self.options.retain = retain;
		self
	}

	pub async fn publish(&self, data: &T) -> Result<(), MqttClientError> {
		let payload = OutboundPayload::json(data)?.into_bytes()?;
		self.transport
			.publish(&self.topic, payload, self.options)
			.await
			.map_err(|source| MqttClientError::Publish {
				topic: self.topic.to_string(),
				source,
			})
	}

	/// Removes the retained message on this topic by publishing an empty
	/// retained payload.
	pub async fn clear_retained(&self) -> Result<(), MqttClientError> {
		let options = self.options.with_retain(true);
		self.transport
			.publish(&self.topic, Bytes::new(), options)
			.await
			.map_err(|source| MqttClientError::Publish {
				topic: self.topic.to_string(),
				source,
			})
	}
}
