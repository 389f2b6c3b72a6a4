use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arcstr::ArcStr;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use super::arguments::{HandlerArg, HandlerArgs};
use super::descriptor::{MAX_HANDLER_ARGUMENTS, ParameterKind};
use super::error::DispatchError;
use super::handler::PreHandleHook;
use super::subscription_registry::{SubscriberEntry, SubscriptionRegistry};
use crate::message_transform::Payload;
use crate::topic::TopicMatch;
use crate::transport::InboundMessage;

/// How a message was disposed of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
	/// Delivered to the handler registered by `owner`
	Handled {
		/// Owner label of the entry
		owner: ArcStr,
	},
	/// No subscriber matches the topic
	Unrouted,
}

/// Delivers inbound messages to the first matching subscriber.
///
/// Messages are processed one at a time in arrival order; a slow handler
/// delays the next message. Every failure (decode, hook, handler, panic)
/// is contained to the message that caused it.
#[derive(Clone)]
pub struct Dispatcher {
	registry: Arc<SubscriptionRegistry>,
	before_handle: Option<PreHandleHook>,
}

impl Dispatcher {
	pub fn new(
		registry: Arc<SubscriptionRegistry>,
		before_handle: Option<PreHandleHook>,
	) -> Self {
		Self {
			registry,
			before_handle,
		}
	}

	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.registry
	}

	/// Routes one message and runs its handler.
	///
	/// Order: lookup, pre-handle hook, payload decode, argument build,
	/// handler. The payload is decoded only when a binding asks for it.
	pub async fn dispatch(
		&self,
		message: &InboundMessage,
	) -> Result<Dispatched, DispatchError> {
		let Some(entry) = self.registry.lookup(&message.topic) else {
			return Ok(Dispatched::Unrouted);
		};

		if let Some(hook) = &self.before_handle {
			self.run_hook(hook, message)?;
		}

		let args = build_args(entry, message)?;
		trace!(
			topic = %message.topic,
			owner = %entry.owner(),
			args = args.len(),
			"Invoking handler"
		);

		let handler = entry.handler().clone();
		match AssertUnwindSafe(handler.handle(args)).catch_unwind().await {
			| Ok(Ok(())) => Ok(Dispatched::Handled {
				owner: entry.owner().clone(),
			}),
			| Ok(Err(source)) => Err(DispatchError::Handler {
				owner: entry.owner().clone(),
				topic: message.topic.clone(),
				source,
			}),
			| Err(panic) => Err(DispatchError::Panicked {
				stage: entry.owner().clone(),
				topic: message.topic.clone(),
				message: panic_message(panic.as_ref()),
			}),
		}
	}

	fn run_hook(
		&self,
		hook: &PreHandleHook,
		message: &InboundMessage,
	) -> Result<(), DispatchError> {
		let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
			hook(&message.topic, &message.payload, &message.packet)
		}));
		match outcome {
			| Ok(Ok(())) => Ok(()),
			| Ok(Err(source)) => Err(DispatchError::Hook {
				topic: message.topic.clone(),
				source,
			}),
			| Err(panic) => Err(DispatchError::Panicked {
				stage: arcstr::literal!("pre-handle hook"),
				topic: message.topic.clone(),
				message: panic_message(panic.as_ref()),
			}),
		}
	}

	/// Dispatches one message and logs the outcome. Never fails, even if
	/// user code panics outside the guarded stages.
	pub async fn handle_message(&self, message: InboundMessage) {
		let outcome =
			AssertUnwindSafe(self.dispatch(&message)).catch_unwind().await;
		let outcome = match outcome {
			| Ok(outcome) => outcome,
			| Err(panic) => Err(DispatchError::Panicked {
				stage: arcstr::literal!("dispatch"),
				topic: message.topic.clone(),
				message: panic_message(panic.as_ref()),
			}),
		};
		match outcome {
			| Ok(Dispatched::Handled { owner }) => {
				trace!(topic = %message.topic, owner = %owner, "Message handled");
			}
			| Ok(Dispatched::Unrouted) => {
				debug!(topic = %message.topic, "No subscriber for topic, message dropped");
			}
			| Err(err @ DispatchError::Decode { .. }) => {
				warn!(error = %err, "Dropping message with undecodable payload");
			}
			| Err(err) => {
				error!(error = %err, "Message dispatch failed");
			}
		}
	}

	/// Consumes the inbound queue until every sender is gone.
	pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
		info!(subscribers = self.registry.len(), "Dispatcher started");
		while let Some(message) = inbound.recv().await {
			self.handle_message(message).await;
		}
		info!("Dispatcher stopped, inbound channel closed");
	}

	/// Drains `inbound` before the registry exists.
	///
	/// Until `ready` yields the dispatcher, messages wait in a backlog of at
	/// most `backlog` entries, the oldest being dropped on overflow. The
	/// backlog is then dispatched in arrival order and the loop continues
	/// as [`run`](Self::run). Stops without dispatching if `ready` is
	/// dropped.
	pub async fn run_when_ready(
		mut ready: oneshot::Receiver<Dispatcher>,
		mut inbound: mpsc::Receiver<InboundMessage>,
		backlog: usize,
	) {
		let mut pending: VecDeque<InboundMessage> = VecDeque::new();
		let mut closed = false;

		let dispatcher = loop {
			if closed {
				match (&mut ready).await {
					| Ok(dispatcher) => break dispatcher,
					| Err(_) => return,
				}
			}
			tokio::select! {
				biased;
				dispatcher = &mut ready => match dispatcher {
					| Ok(dispatcher) => break dispatcher,
					| Err(_) => {
						debug!(
							dropped = pending.len(),
							"Registration abandoned, dispatcher stopping"
						);
						return;
					}
				},
				message = inbound.recv() => match message {
					| Some(message) => {
						if pending.len() >= backlog {
							if let Some(dropped) = pending.pop_front() {
								warn!(
									topic = %dropped.topic,
									backlog,
									"Backlog full during registration, oldest message dropped"
								);
							}
						}
						pending.push_back(message);
					}
					| None => closed = true,
				},
			}
		};

		debug!(backlog = pending.len(), "Registry ready, dispatching backlog");
		for message in pending {
			dispatcher.handle_message(message).await;
		}
		if !closed {
			dispatcher.run(inbound).await;
		}
	}
}

/// Positional arguments for `entry`, one slot per index up to the highest
/// bound index.
fn build_args(
	entry: &SubscriberEntry,
	message: &InboundMessage,
) -> Result<HandlerArgs, DispatchError> {
	let bindings = entry.parameters();
	let slots = match bindings.iter().map(|b| b.index).max() {
		| Some(index) if index >= MAX_HANDLER_ARGUMENTS => {
			return Err(DispatchError::InvalidBinding {
				owner: entry.owner().clone(),
				index,
				max: MAX_HANDLER_ARGUMENTS,
			});
		}
		| Some(index) => index + 1,
		| None => 0,
	};
	let mut args: Vec<Option<HandlerArg>> = vec![None; slots];

	let mut payload: Option<Payload> = None;
	let mut captures = None;

	for binding in bindings {
		let value = match binding.kind {
			| ParameterKind::Payload => {
				if payload.is_none() {
					let transform = entry.descriptor().payload_transform();
					let decoded = std::panic::catch_unwind(AssertUnwindSafe(|| {
						transform.decode(&message.payload)
					}))
					.map_err(|panic| DispatchError::Panicked {
						stage: arcstr::literal!("payload transform"),
						topic: message.topic.clone(),
						message: panic_message(panic.as_ref()),
					})?
					.map_err(|source| DispatchError::Decode {
						topic: message.topic.clone(),
						transform: transform.kind(),
						source,
					})?;
					payload = Some(decoded);
				}
				payload.clone().map(HandlerArg::Payload)
			}
			| ParameterKind::Topic => Some(HandlerArg::Topic(message.topic.clone())),
			| ParameterKind::Packet => {
				Some(HandlerArg::Packet(message.packet.clone()))
			}
			| ParameterKind::Params => {
				if captures.is_none() {
					captures = Some(
						entry
							.matcher()
							.captures(message.topic.clone())
							.map(TopicMatch::into_captures)
							.unwrap_or_default(),
					);
				}
				captures.clone().map(HandlerArg::Params)
			}
		};
		args[binding.index] = value;
	}
	Ok(HandlerArgs::from_slots(args))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
