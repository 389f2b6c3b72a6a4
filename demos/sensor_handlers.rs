//! # Sensor handlers
//!
//! Registers handlers for a small building-automation setup and publishes
//! a few messages to itself:
//! - `rooms/+/temperature` decoded as JSON, room name from the wildcard
//! - `rooms/+/log` decoded as text
//! - a `Thermostat` component discovered after connecting
//! - a shared subscription group for `alerts/#`
//!
//! ```bash
//! MQTT_BROKER=mqtt://localhost:1883 cargo run --example sensor_handlers
//! ```

mod shared;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mqtt_topic_dispatch::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
struct Temperature {
	celsius: f64,
}

async fn on_temperature(args: HandlerArgs) -> HandlerResult {
	let room: String = args.param(0, 0)?;
	let reading: Temperature = args.json(1)?;
	println!("[temperature] {room}: {:.1} C", reading.celsius);
	Ok(())
}

async fn on_log(args: HandlerArgs) -> HandlerResult {
	println!("[log] {}: {}", args.topic(0)?, args.text(1)?);
	Ok(())
}

async fn on_alert(args: HandlerArgs) -> HandlerResult {
	let path: String = args.param(0, 0)?;
	println!("[alert] {path}");
	Ok(())
}

struct Thermostat {
	setpoint_updates: AtomicU32,
}

impl Component for Thermostat {
	fn name(&self) -> &str {
		"Thermostat"
	}

	fn subscriptions(self: Arc<Self>) -> Vec<SubscriptionMethod> {
		vec![SubscriptionMethod::new(
			"on_setpoint",
			"thermostat/setpoint",
			[ParameterBinding::payload(0)],
			move |args: HandlerArgs| {
				let this = self.clone();
				async move {
					let value: f64 = args.json(0)?;
					let count =
						this.setpoint_updates.fetch_add(1, Ordering::Relaxed) + 1;
					println!("[thermostat] setpoint {value} (update #{count})");
					HandlerResult::Ok(())
				}
			},
		)]
	}
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
	shared::tracing::setup(None);

	let mut router = MessageRouter::new();
	router
		.register(
			"rooms/+/temperature",
			[ParameterBinding::params(0), ParameterBinding::payload(1)],
			on_temperature,
		)
		.register(
			SubscriptionDescriptor::new("rooms/+/log")
				.transform(PayloadTransform::Text),
			[ParameterBinding::topic(0), ParameterBinding::payload(1)],
			on_log,
		)
		.register(
			SubscriptionDescriptor::new("alerts/#").share("alert-workers"),
			[ParameterBinding::params(0)],
			on_alert,
		)
		.component(Arc::new(Thermostat {
			setpoint_updates: AtomicU32::new(0),
		}));

	let url = shared::config::build_url("sensor_handlers");
	println!("Connecting to {url}");
	let config = MqttClientConfig::from_url(&url)?.with_before_handle(
		|topic, payload, _packet| {
			tracing::debug!(topic, bytes = payload.len(), "Inbound message");
			Ok(())
		},
	);
	let (client, mut connection) =
		MqttClient::connect_with_config(config, router).await?;

	for entry in client.subscribers() {
		println!("subscribed {} -> {}", entry.topic(), entry.owner());
	}

	let options = PublishOptions::default();
	client
		.publish_json(
			"rooms/kitchen/temperature",
			&Temperature { celsius: 21.5 },
			options,
		)
		.await?;
	client.publish("rooms/kitchen/log", "oven preheated", options).await?;
	client.publish("thermostat/setpoint", "22.5", options).await?;
	client.publish("alerts/fire/zone-3", "{}", options).await?;

	tokio::time::sleep(Duration::from_secs(1)).await;
	connection.shutdown().await;
	Ok(())
}
