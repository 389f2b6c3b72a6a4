use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing based on environment or explicit configuration
///
/// Priority (first match wins):
/// 1. If `force_level` provided - use it
/// 2. If RUST_LOG_DISABLE=1 - disable tracing completely
/// 3. If RUST_LOG set - use environment configuration
/// 4. Otherwise - `info` for this crate only
///
/// ```bash
/// RUST_LOG=mqtt_topic_dispatch=debug cargo run --example sensor_handlers
/// ```
pub fn setup(force_level: Option<&str>) {
	dotenv::from_filename("demos/.env").ok();

	if std::env::var("RUST_LOG_DISABLE").is_ok() {
		return;
	}

	let filter = if let Some(level) = force_level {
		tracing_subscriber::EnvFilter::new(level)
	} else {
		tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| "mqtt_topic_dispatch=info".into())
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(true)
				.with_thread_ids(false)
				.with_file(false)
				.with_line_number(false)
				.compact(),
		)
		.init();
}
