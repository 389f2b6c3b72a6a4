use thiserror::Error;

/// Connection could not be established.
///
/// Failures after the first successful connect are not surfaced as errors:
/// they are logged and retried with backoff until shutdown.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
	/// Transport or broker reported an error during the handshake
	#[error("Connection failed: {0}")]
	Network(String),

	/// Connection was closed before the broker accepted it
	#[error("Connection closed before it was established")]
	Closed,

	/// Transport event stream ended
	#[error("Transport event stream ended")]
	EventStreamEnded,

	/// Broker did not accept the connection in time
	#[error("Connection not established within {timeout_millis} ms")]
	Timeout {
		/// Configured connect timeout
		timeout_millis: u64,
	},
}
