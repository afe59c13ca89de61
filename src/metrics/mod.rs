/*!
 * # Metrics Module
 *
 * Prometheus counters for requisition workflow activity. Commands bump these
 * as they succeed or fail; [`render`] produces the text exposition format.
 */

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::ServiceError;

lazy_static! {
    pub static ref REQUISITIONS_SUBMITTED: IntCounter = IntCounter::new(
        "requisitions_submitted_total",
        "Total number of requisitions submitted for approval"
    )
    .expect("metric can be created");
    pub static ref APPROVAL_DECISIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "approval_decisions_total",
            "Total number of approval decisions recorded"
        ),
        &["decision", "role"]
    )
    .expect("metric can be created");
    pub static ref LINE_ITEM_MUTATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "line_item_mutations_total",
            "Total number of line item additions, updates and removals"
        ),
        &["operation"]
    )
    .expect("metric can be created");
    pub static ref ACTION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "requisition_action_failures_total",
            "Total number of refused or failed requisition actions"
        ),
        &["action", "error_type"]
    )
    .expect("metric can be created");
    static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(REQUISITIONS_SUBMITTED.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(APPROVAL_DECISIONS.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(LINE_ITEM_MUTATIONS.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(ACTION_FAILURES.clone()))
            .expect("metric can be registered");
        registry
    };
}

/// Counts a refused or failed `action`, labelled with the error kind.
pub fn record_failure(action: &str, err: &ServiceError) {
    ACTION_FAILURES
        .with_label_values(&[action, err.kind()])
        .inc();
}

/// Renders all counters in the Prometheus text format.
pub fn render() -> Result<String, ServiceError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ServiceError::SerializationError(e.to_string()))
}
