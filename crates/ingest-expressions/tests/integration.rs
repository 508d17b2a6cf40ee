//! Integration tests for the expression engine

use ingest_expressions::prelude::*;
use ingest_expressions::{Condition, ConfigLoader, ErrorCategory, ParsedExpression};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ingest_expressions=debug")
        .with_test_writer()
        .try_init();
}

fn event_context(data: Json) -> EvaluationContext {
    EvaluationContext::new(json!({"name": "app/test", "data": data}))
}

fn correlated(event: Json, candidate: Json) -> EvaluationContext {
    EvaluationContext::correlated(
        json!({"name": "app/original", "data": event}),
        json!({"name": "app/candidate", "data": candidate}),
    )
}

#[test]
fn test_event_only_expression_never_needs_async() {
    init_tracing();
    let fixture = ExpressionEngine::new();
    let context = event_context(json!({"amount": 10}));

    for source in [
        "event.data.amount > 5",
        "event.data.missing == 'x'",
        "!event.data.amount",
        "event.name == 'app/test' ? event.data.amount : 0",
    ] {
        let actual = fixture.evaluate(source, &context);
        assert!(
            !matches!(actual, Err(ExpressionError::BindingError { .. })),
            "{source} raised a binding error"
        );
    }
}

#[test]
fn test_async_reference_without_binding() {
    let fixture = ExpressionEngine::new();
    let actual = fixture.evaluate(
        "event.data.orderId == async.data.orderId",
        &event_context(json!({"orderId": "A1"})),
    );

    let error = actual.unwrap_err();
    assert_eq!(error.category(), ErrorCategory::Binding);
    assert!(!error.is_retryable());
}

#[test]
fn test_logical_operators_short_circuit() {
    let fixture = ExpressionEngine::new();
    let context = event_context(json!({}));

    // The right operands raise a binding error when evaluated
    let actual = fixture
        .evaluate_bool("false && async.data.x == 1", &context)
        .unwrap();
    assert_eq!(actual, false);

    let actual = fixture
        .evaluate_bool("true || async.data.x == 1", &context)
        .unwrap();
    assert_eq!(actual, true);
}

#[test]
fn test_or_of_strings_is_boolean() {
    let fixture = ExpressionEngine::new();
    let actual = fixture.evaluate("'x' || 'y'", &event_context(json!({}))).unwrap();
    let expected = ExpressionValue::bool(true);
    assert_eq!(actual, expected);
}

#[test]
fn test_match_shorthand_is_equivalent_to_expression() {
    let fixture = ExpressionEngine::new();
    let shorthand = fixture
        .parse(
            &Condition::Match("data.userId".to_string())
                .to_expression(ExpressionUsage::Cancellation)
                .unwrap(),
        )
        .unwrap();
    // Spaced differently so the cache cannot hand back the shorthand's parse
    let written = fixture.parse("event.data.userId==async.data.userId").unwrap();
    assert!(!Arc::ptr_eq(&shorthand, &written));

    let contexts = [
        correlated(json!({"userId": "u1"}), json!({"userId": "u1"})),
        correlated(json!({"userId": "u1"}), json!({"userId": "u2"})),
        correlated(json!({"userId": 1}), json!({"userId": 1.0})),
        correlated(json!({"userId": "u1"}), json!({})),
        correlated(json!({}), json!({})),
        correlated(json!({"userId": null}), json!({})),
    ];

    for context in &contexts {
        let actual = fixture.evaluator().evaluate_bool(&shorthand, context).unwrap();
        let expected = fixture.evaluator().evaluate_bool(&written, context).unwrap();
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_missing_field_comparison_is_false() {
    let fixture = ExpressionEngine::new();
    let actual = fixture
        .evaluate_bool("event.data.missing == 'x'", &EvaluationContext::new(json!({"data": {}})))
        .unwrap();
    let expected = false;
    assert_eq!(actual, expected);
}

#[test]
fn test_conditional_evaluates_one_branch() {
    let fixture = ExpressionEngine::new();
    let actual = fixture
        .evaluate("true ? 1 : async.data.x", &event_context(json!({})))
        .unwrap();
    let expected = ExpressionValue::int(1);
    assert_eq!(actual, expected);
}

#[test]
fn test_cancellation_by_order_id() {
    init_tracing();
    let fixture = ExpressionEngine::new();
    let cancel_on = fixture
        .cancellation(
            &CorrelationConfig::new("app/order.cancelled")
                .with_if("event.data.orderId == async.data.orderId"),
        )
        .unwrap();
    let original = Event::new("app/order.created", json!({"orderId": "A1"}));

    let actual = cancel_on
        .matches(
            &original,
            &Event::new("app/order.cancelled", json!({"orderId": "A1"})),
        )
        .unwrap();
    assert_eq!(actual, true);

    let actual = cancel_on
        .matches(
            &original,
            &Event::new("app/order.cancelled", json!({"orderId": "A2"})),
        )
        .unwrap();
    assert_eq!(actual, false);
}

#[test]
fn test_priority_by_plan() {
    let fixture = ExpressionEngine::new();
    let priority = fixture
        .priority("event.data.plan == 'enterprise' ? 120 : 0")
        .unwrap();

    let actual = priority
        .evaluate(&Event::new("app/run", json!({"plan": "enterprise"})))
        .unwrap();
    assert_eq!(actual, 120);

    let actual = priority
        .evaluate(&Event::new("app/run", json!({"plan": "free"})))
        .unwrap();
    assert_eq!(actual, 0);
}

#[test]
fn test_flow_key_rendering() {
    let fixture = ExpressionEngine::new();
    let event = Event::new("app/run", json!({"userId": "u_42", "account": 7, "ratio": 3.0}));

    let actual = fixture.flow_key("event.data.userId").unwrap().evaluate(&event).unwrap();
    assert_eq!(actual, "u_42");

    let actual = fixture.flow_key("event.data.account").unwrap().evaluate(&event).unwrap();
    assert_eq!(actual, "7");

    let actual = fixture.flow_key("event.data.ratio").unwrap().evaluate(&event).unwrap();
    assert_eq!(actual, "3");

    let actual = fixture.flow_key("event.data").unwrap().evaluate(&event);
    assert!(matches!(actual, Err(ExpressionError::TypeError { .. })));
}

#[test]
fn test_trigger_filter_on_event_envelope() {
    let fixture = ExpressionEngine::new();
    let filter = fixture
        .trigger_filter("event.name == 'app/signup' && event.user.email != null")
        .unwrap();
    let event = Event::new("app/signup", json!({})).user(json!({"email": "a@example.com"}));

    let actual = filter.matches(&event).unwrap();
    let expected = true;
    assert_eq!(actual, expected);
}

#[test]
fn test_parse_error_reports_position() {
    let fixture = ExpressionEngine::new();
    let actual = fixture
        .parse("event.data.a == == 1")
        .unwrap_err();

    match actual {
        ExpressionError::ParseError {
            position, fragment, ..
        } => {
            assert_eq!(position, 16);
            assert_eq!(fragment, "==");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_nesting_limit_is_enforced() {
    let fixture = ExpressionEngine::builder()
        .with_security(SecurityConfig::default().max_nesting_depth(4))
        .build();
    let source = format!("{}true{}", "(".repeat(10), ")".repeat(10));

    let actual = fixture.parse(&source).unwrap_err();
    assert_eq!(actual.category(), ErrorCategory::Limit);
}

#[test]
fn test_long_logical_chain_within_default_limits() {
    let fixture = ExpressionEngine::new();
    let source = format!("{}true", "true&&".repeat(1600));

    let actual = fixture.evaluate_bool(&source, &event_context(json!({}))).unwrap();
    let expected = true;
    assert_eq!(actual, expected);

    let source = format!("{}event.data.ok", "false||".repeat(1200));
    let actual = fixture
        .evaluate_bool(&source, &event_context(json!({"ok": true})))
        .unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn test_engine_from_loaded_config() {
    let fixture = ConfigLoader::new()
        .with_env_prefix("INNGEST_EXPRESSIONS_INTEGRATION_TEST")
        .load()
        .unwrap();
    let engine = ExpressionEngine::from_config(&fixture).unwrap();

    let actual = engine
        .evaluate_bool("event.data.ok", &event_context(json!({"ok": true})))
        .unwrap();
    assert_eq!(actual, true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_evaluation_of_shared_expression() {
    let engine = Arc::new(ExpressionEngine::new());
    let expression: Arc<ParsedExpression> = engine
        .compile(
            "event.data.orderId == async.data.orderId",
            ExpressionUsage::WaitForEvent,
        )
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = Arc::clone(&engine);
        let expression = Arc::clone(&expression);
        handles.push(tokio::spawn(async move {
            let candidate = if i % 2 == 0 { "A1" } else { "A2" };
            let context = correlated(json!({"orderId": "A1"}), json!({"orderId": candidate}));
            let matched = engine.evaluator().evaluate_bool(&expression, &context).unwrap();
            (i, matched)
        }));
    }

    for handle in handles {
        let (i, actual) = handle.await.unwrap();
        let expected = i % 2 == 0;
        assert_eq!(actual, expected);
    }

    // The second compile of the same text comes from the cache
    let again = engine
        .compile(
            "event.data.orderId == async.data.orderId",
            ExpressionUsage::Cancellation,
        )
        .unwrap();
    assert!(Arc::ptr_eq(&again, &expression));
}
