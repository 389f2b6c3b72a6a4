use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;

use crate::BoxError;

/// Username and optional password presented to the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	pub username: String,
	pub password: Option<String>,
}

impl Credentials {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: Some(password.into()),
		}
	}

	pub fn username_only(username: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: None,
		}
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Credential provider failed; the previous credentials stay in use.
#[derive(Debug, Error)]
#[error("Credential provider failed: {source}")]
pub struct CredentialError {
	#[source]
	source: BoxError,
}

impl CredentialError {
	pub fn new(source: impl Into<BoxError>) -> Self {
		Self {
			source: source.into(),
		}
	}
}

/// Source of fresh credentials, queried at connect and before every
/// reconnect attempt.
///
/// Implemented for async closures returning
/// `Result<Credentials, CredentialError>`.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
	async fn credentials(&self) -> Result<Credentials, CredentialError>;
}

#[async_trait]
impl<F, Fut> CredentialProvider for F
where
	F: Fn() -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Credentials, CredentialError>> + Send + 'static,
{
	async fn credentials(&self) -> Result<Credentials, CredentialError> {
		(self)().await
	}
}
