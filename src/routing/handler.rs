use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arcstr::ArcStr;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::Publish;

use super::arguments::HandlerArgs;
use super::descriptor::{ParameterBinding, SubscriptionDescriptor};
use crate::BoxError;

/// Outcome of one handler invocation.
pub type HandlerResult = Result<(), BoxError>;

/// Hook invoked with `(topic, raw payload, raw packet)` before every handler.
///
/// An error or panic from the hook is treated like a handler failure: it is
/// logged and the message is dropped.
pub type PreHandleHook =
	Arc<dyn Fn(&str, &Bytes, &Publish) -> Result<(), BoxError> + Send + Sync>;

/// Receives messages routed to a subscription.
///
/// Implemented for every `Fn(HandlerArgs)` returning a future of
/// [`HandlerResult`], so async functions and closures register directly.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
	async fn handle(&self, args: HandlerArgs) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
	F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = HandlerResult> + Send + 'static,
{
	async fn handle(&self, args: HandlerArgs) -> HandlerResult {
		(self)(args).await
	}
}

/// One subscribed method of a [`Component`].
pub struct SubscriptionMethod {
	pub method: ArcStr,
	pub descriptor: SubscriptionDescriptor,
	pub parameters: Vec<ParameterBinding>,
	pub handler: Arc<dyn MessageHandler>,
}

impl SubscriptionMethod {
	pub fn new(
		method: impl Into<ArcStr>,
		descriptor: impl Into<SubscriptionDescriptor>,
		parameters: impl IntoIterator<Item = ParameterBinding>,
		handler: impl MessageHandler,
	) -> Self {
		Self {
			method: method.into(),
			descriptor: descriptor.into(),
			parameters: parameters.into_iter().collect(),
			handler: Arc::new(handler),
		}
	}
}

/// Instance exposing subscribed methods for automatic registration.
///
/// Components are enumerated after connecting when the client's
/// `auto_subscribe` flag is set. Each returned method is registered under the
/// owner label `<name>::<method>`.
pub trait Component: Send + Sync + 'static {
	fn name(&self) -> &str;

	/// Methods of this instance together with their subscription metadata.
	/// Handlers usually capture a clone of `self`.
	fn subscriptions(self: Arc<Self>) -> Vec<SubscriptionMethod>;
}

/// Handler binding waiting to be registered.
#[derive(Clone)]
pub struct HandlerRegistration {
	pub descriptor: Arc<SubscriptionDescriptor>,
	pub parameters: Arc<[ParameterBinding]>,
	pub handler: Arc<dyn MessageHandler>,
	/// Label identifying the owning instance in logs
	pub owner: ArcStr,
}

impl HandlerRegistration {
	pub fn new(
		owner: impl Into<ArcStr>,
		descriptor: impl Into<SubscriptionDescriptor>,
		parameters: impl IntoIterator<Item = ParameterBinding>,
		handler: Arc<dyn MessageHandler>,
	) -> Self {
		Self {
			descriptor: Arc::new(descriptor.into()),
			parameters: parameters.into_iter().collect(),
			handler,
			owner: owner.into(),
		}
	}

	pub(crate) fn from_method(
		component: &str,
		method: SubscriptionMethod,
	) -> Self {
		Self {
			descriptor: Arc::new(method.descriptor),
			parameters: method.parameters.into(),
			handler: method.handler,
			owner: arcstr::format!("{component}::{}", method.method),
		}
	}
}

impl fmt::Debug for HandlerRegistration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HandlerRegistration")
			.field("owner", &self.owner)
			.field("descriptor", &self.descriptor)
			.field("parameters", &self.parameters)
			.finish_non_exhaustive()
	}
}

/// Startup list of handlers to register once connected.
///
/// Explicit registrations are subscribed in call order, followed by the
/// methods of every component (only when auto-subscribe is enabled).
///
/// ```rust
/// use mqtt_topic_dispatch::prelude::*;
///
/// async fn on_temperature(args: HandlerArgs) -> HandlerResult {
/// 	let sensor: String = args.param(0, 0)?;
/// 	let reading = args.payload(1)?;
/// 	println!("{sensor}: {reading:?}");
/// 	Ok(())
/// }
///
/// let mut router = MessageRouter::new();
/// router.register(
/// 	"sensors/+/temperature",
/// 	[ParameterBinding::params(0), ParameterBinding::payload(1)],
/// 	on_temperature,
/// );
/// ```
#[derive(Default)]
pub struct MessageRouter {
	registrations: Vec<HandlerRegistration>,
	components: Vec<Arc<dyn Component>>,
}

impl MessageRouter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a handler owned by the router itself.
	pub fn register(
		&mut self,
		descriptor: impl Into<SubscriptionDescriptor>,
		parameters: impl IntoIterator<Item = ParameterBinding>,
		handler: impl MessageHandler,
	) -> &mut Self {
		self.register_as("router", descriptor, parameters, handler)
	}

	/// Adds a handler under an explicit owner label.
	pub fn register_as(
		&mut self,
		owner: impl Into<ArcStr>,
		descriptor: impl Into<SubscriptionDescriptor>,
		parameters: impl IntoIterator<Item = ParameterBinding>,
		handler: impl MessageHandler,
	) -> &mut Self {
		self.registrations.push(HandlerRegistration::new(
			owner,
			descriptor,
			parameters,
			Arc::new(handler),
		));
		self
	}

	pub fn component(&mut self, component: Arc<dyn Component>) -> &mut Self {
		self.components.push(component);
		self
	}

	pub fn len(&self) -> usize {
		self.registrations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.registrations.is_empty() && self.components.is_empty()
	}

	/// Splits into explicit registrations and the components to explore.
	pub fn into_parts(
		self,
	) -> (Vec<HandlerRegistration>, Vec<Arc<dyn Component>>) {
		(self.registrations, self.components)
	}
}

/// Expands components into registrations, in component then method order.
pub(crate) fn discover(
	components: Vec<Arc<dyn Component>>,
) -> Vec<HandlerRegistration> {
	components
		.into_iter()
		.flat_map(|component| {
			let name = ArcStr::from(component.name());
			component
				.subscriptions()
				.into_iter()
				.map(move |method| {
					HandlerRegistration::from_method(&name, method)
				})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn noop(_args: HandlerArgs) -> HandlerResult {
		Ok(())
	}

	struct Thermostat;

	impl Component for Thermostat {
		fn name(&self) -> &str {
			"Thermostat"
		}

		fn subscriptions(self: Arc<Self>) -> Vec<SubscriptionMethod> {
			vec![
				SubscriptionMethod::new(
					"on_setpoint",
					"thermostat/setpoint",
					[ParameterBinding::payload(0)],
					noop,
				),
				SubscriptionMethod::new(
					"on_mode",
					"thermostat/mode",
					Vec::new(),
					noop,
				),
			]
		}
	}

	#[test]
	fn test_discover_labels_owner_with_component_and_method() {
		let registrations = discover(vec![Arc::new(Thermostat)]);
		let owners: Vec<&str> =
			registrations.iter().map(|r| r.owner.as_str()).collect();
		assert_eq!(owners, ["Thermostat::on_setpoint", "Thermostat::on_mode"]);
		assert_eq!(
			registrations[0].descriptor.topics()[0].as_str(),
			"thermostat/setpoint"
		);
	}

	#[test]
	fn test_router_keeps_registration_order() {
		let mut router = MessageRouter::new();
		router
			.register("a/+", Vec::new(), noop)
			.register_as("audit", "a/b", [], noop);

		let (registrations, components) = router.into_parts();
		assert!(components.is_empty());
		let owners: Vec<&str> =
			registrations.iter().map(|r| r.owner.as_str()).collect();
		assert_eq!(owners, ["router", "audit"]);
	}
}
