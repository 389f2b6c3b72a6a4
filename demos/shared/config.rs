use std::env;

/// MQTT broker URL from `MQTT_BROKER` (also read from `demos/.env`),
/// defaulting to a local plain-text broker.
pub fn broker_url() -> String {
	dotenv::from_filename("demos/.env").ok();
	env::var("MQTT_BROKER")
		.unwrap_or_else(|_| "mqtt://localhost:1883".to_string())
}

/// Broker URL with a per-process client id.
pub fn build_url(client_id_prefix: &str) -> String {
	let base_url = broker_url();
	let client_id = format!("{client_id_prefix}_{}", std::process::id());
	if base_url.contains('?') {
		format!("{base_url}&client_id={client_id}")
	} else {
		format!("{base_url}?client_id={client_id}")
	}
}
