//! Message routing and handler dispatch module
//!
//! This module holds the subscription data model, the registry of
//! pattern-to-handler bindings and the dispatcher that delivers every
//! inbound message to the first matching handler.

/// Typed handler arguments
pub mod arguments;
/// Subscription descriptors and parameter bindings
pub mod descriptor;
pub mod dispatcher;
/// Routing and dispatch error types
pub mod error;
/// Handler trait, components and the startup router
pub mod handler;
pub mod subscription_registry;

// Re-export commonly used types for convenience
pub use arguments::{ArgumentError, HandlerArg, HandlerArgs};
pub use descriptor::{
	MAX_HANDLER_ARGUMENTS, ParameterBinding, ParameterKind,
	SubscriptionDescriptor,
};
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::{DispatchError, SubscriptionError};
pub use handler::{
	Component, HandlerRegistration, HandlerResult, MessageHandler,
	MessageRouter, PreHandleHook, SubscriptionMethod,
};
pub use subscription_registry::{SubscriberEntry, SubscriptionRegistry};
