use std::sync::{Arc, Mutex};

use arcstr::ArcStr;

use super::limits::MAX_TOPIC_LENGTH;
use super::topic_preprocessor::{
	TopicPreprocessor, TopicResolver, strip_namespace,
};
use crate::routing::SubscriptionDescriptor;

fn resolver(
	values: &'static [(&'static str, &'static str)],
) -> (TopicResolver, Arc<Mutex<Vec<String>>>) {
	let calls = Arc::new(Mutex::new(Vec::new()));
	let recorded = calls.clone();
	let resolver: TopicResolver = Arc::new(move |name: &str| {
		recorded.lock().unwrap().push(name.to_string());
		values
			.iter()
			.find(|(key, _)| *key == name)
			.map(|(_, value)| value.to_string())
			.unwrap_or_default()
	});
	(resolver, calls)
}

#[test]
fn test_strip_namespace() {
	assert_eq!(strip_namespace("a/b"), "a/b");
	assert_eq!(strip_namespace("$queue/a/b"), "a/b");
	assert_eq!(strip_namespace("$share/g1/a/b"), "a/b");
	assert_eq!(strip_namespace("$queue/$share/g1/a"), "a");
	// no group: not a share namespace
	assert_eq!(strip_namespace("$share//a"), "$share//a");
	assert_eq!(strip_namespace("$SYS/load"), "$SYS/load");
}

#[test]
fn test_any_applied_share_group_strips_back_to_the_route() {
	for group in ["g1", "alert-workers", "a.b", "team_2"] {
		let shared =
			TopicPreprocessor::new().with_share(Some(ArcStr::from(group)));
		let wire = shared.preprocess_topic("alerts/#", None, None);
		assert_eq!(wire, format!("$share/{group}/alerts/#"));
		assert_eq!(strip_namespace(&wire), "alerts/#");
	}
}

#[test]
fn test_queue_prefix_is_idempotent() {
	let queued = TopicPreprocessor::new().with_queue(true);
	assert_eq!(queued.preprocess_topic("x", None, None), "$queue/x");
	assert_eq!(queued.preprocess_topic("$queue/x", None, None), "$queue/x");

	let plain = TopicPreprocessor::new();
	assert_eq!(
		plain.preprocess_topic("$queue/x", Some(true), None),
		plain.preprocess_topic("x", Some(true), None)
	);
}

#[test]
fn test_share_prefix_is_idempotent() {
	let shared = TopicPreprocessor::new().with_share(Some(ArcStr::from("g")));
	assert_eq!(shared.preprocess_topic("a/+", None, None), "$share/g/a/+");
	assert_eq!(
		shared.preprocess_topic("$share/g/a/+", None, None),
		"$share/g/a/+"
	);
	// an existing group is replaced by the effective one
	assert_eq!(
		shared.preprocess_topic("$share/old/a/+", None, None),
		"$share/g/a/+"
	);
}

#[test]
fn test_queue_wins_over_share() {
	let both = TopicPreprocessor::new()
		.with_queue(true)
		.with_share(Some(ArcStr::from("g")));
	assert_eq!(both.preprocess_topic("a", None, None), "$queue/a");
	assert_eq!(both.preprocess_topic("a", None, Some("h")), "$queue/a");

	let plain = TopicPreprocessor::new();
	assert_eq!(plain.preprocess_topic("a", Some(true), Some("h")), "$queue/a");
}

#[test]
fn test_subscription_overrides_module_defaults() {
	let defaults = TopicPreprocessor::new()
		.with_queue(true)
		.with_share(Some(ArcStr::from("g")));

	assert_eq!(
		defaults.preprocess_topic("a", Some(false), None),
		"$share/g/a"
	);
	assert_eq!(
		defaults.preprocess_topic("a", Some(false), Some("h")),
		"$share/h/a"
	);
	// empty group disables sharing
	assert_eq!(defaults.preprocess_topic("a", Some(false), Some("")), "a");
	assert_eq!(
		defaults.preprocess_topic("$queue/a", Some(false), Some("")),
		"a"
	);
}

#[test]
fn test_resolver_called_once_per_occurrence() {
	let (resolver, calls) = resolver(&[("site", "berlin"), ("id", "7")]);
	let preprocessor = TopicPreprocessor::new().with_resolver(Some(resolver));

	let topic = preprocessor.preprocess_topic(
		"$queue/${site}/dev/${id}/${site}/#",
		Some(false),
		None,
	);
	assert_eq!(topic, "berlin/dev/7/berlin/#");
	assert_eq!(*calls.lock().unwrap(), ["site", "id", "site"]);
}

#[test]
fn test_unterminated_or_invalid_tokens_are_left_alone() {
	let (resolver, calls) = resolver(&[("a", "x")]);
	let preprocessor = TopicPreprocessor::new().with_resolver(Some(resolver));

	assert_eq!(preprocessor.preprocess_topic("${a", None, None), "${a");
	assert_eq!(preprocessor.preprocess_topic("${}/${a}", None, None), "${}/x");
	assert_eq!(
		preprocessor.preprocess_topic("${a b}/${a}", None, None),
		"${a b}/x"
	);
	assert_eq!(*calls.lock().unwrap(), ["a", "a"]);
}

#[test]
fn test_long_patterns_skip_resolution() {
	let (resolver, calls) = resolver(&[("v", "value")]);
	let preprocessor = TopicPreprocessor::new().with_resolver(Some(resolver));

	let long = format!("${{v}}/{}", "x".repeat(MAX_TOPIC_LENGTH));
	assert_eq!(preprocessor.preprocess_topic(&long, None, None), long.as_str());
	assert!(calls.lock().unwrap().is_empty());

	let short = format!("${{v}}/{}", "x".repeat(16));
	assert_eq!(
		preprocessor.preprocess_topic(&short, None, None),
		format!("value/{}", "x".repeat(16)).as_str()
	);
}

#[test]
fn test_preprocess_descriptor_keeps_topic_order() {
	let preprocessor =
		TopicPreprocessor::new().with_share(Some(ArcStr::from("g")));
	let descriptor =
		SubscriptionDescriptor::with_topics(["b/+", "$queue/a/#", "c"])
			.share("");
	assert_eq!(preprocessor.preprocess(&descriptor), ["b/+", "a/#", "c"]);

	let descriptor = SubscriptionDescriptor::new("d").queue(true);
	assert_eq!(preprocessor.preprocess(&descriptor), ["$queue/d"]);
}
