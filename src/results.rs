//! Result aggregation
//!
//! Counts outcomes as the framework reports them, decides when a `start`
//! message must be synthesized, and turns raw framework payloads into wire
//! messages. The aggregator never talks to the transport itself; it returns
//! the messages to send so the dispatch loop stays the single writer.

use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tracing::error;

use crate::adapter::ErrorReport;
use crate::events::ClientEvent;
use crate::protocol::{ErrorMessage, OutboundMessage, StartInfo};

/// Per-run outcome counters
///
/// `total` stays unknown until the framework reports it; the other three
/// start at zero each run and only grow within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounters {
    pub total: Option<u64>,
    pub skipped: u64,
    pub success: u64,
    pub failed: u64,
}

impl RunCounters {
    /// Number of results aggregated so far
    pub fn completed(&self) -> u64 {
        self.skipped + self.success + self.failed
    }
}

/// Aggregates one run's results at a time
///
/// Results are not tagged with a run id: a result arriving late from an
/// abandoned run is counted into whatever run is current. See `begin_run`.
pub struct ResultAggregator {
    counters: RunCounters,
    start_emitted: bool,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl ResultAggregator {
    pub fn new(events: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self {
            counters: RunCounters::default(),
            start_emitted: false,
            events,
        }
    }

    /// Current counters
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Reset for a new run
    ///
    /// Unconditional, even if a previous run is still mid-flight; at most
    /// one run's results are aggregated at a time.
    pub fn begin_run(&mut self) {
        self.counters = RunCounters::default();
        self.start_emitted = false;
    }

    /// Aggregate one raw result; returns the wire messages to send
    ///
    /// Synthesizes `start {total: null}` ahead of the first result if no
    /// start has been signaled yet; the server must always see a start
    /// before any result.
    pub fn report(&mut self, raw: Value) -> Vec<OutboundMessage> {
        let normalized = normalize_result(raw);

        // Skipped takes priority; success and failed are mutually exclusive.
        if is_truthy(normalized.get("skipped")) {
            self.counters.skipped += 1;
        } else if is_truthy(normalized.get("success")) {
            self.counters.success += 1;
        } else {
            self.counters.failed += 1;
        }

        let completed = self.counters.completed();
        if let Some(total) = self.counters.total {
            if completed > total {
                // Protocol-data defect on the server/framework side. Report
                // it and keep counting; clamping would hide the mismatch.
                error!(
                    completed,
                    total, "More results than the announced total; counters left unclamped"
                );
            }
        }

        self.emit(ClientEvent::Result {
            completed,
            total: self.counters.total,
        });

        let mut messages = Vec::with_capacity(2);
        if !self.start_emitted {
            messages.push(OutboundMessage::Start(StartInfo { total: None }));
            self.start_emitted = true;
        }
        messages.push(OutboundMessage::Result(normalized));
        messages
    }

    /// Handle an informational payload
    ///
    /// If no start has been signaled and the payload carries a numeric
    /// `total`, this call itself becomes the start signal; otherwise it is
    /// forwarded as a generic `info` message.
    pub fn info(&mut self, payload: Value) -> OutboundMessage {
        if !self.start_emitted {
            if let Some(total) = payload.get("total").and_then(Value::as_u64) {
                self.counters.total = Some(total);
                self.start_emitted = true;
                return OutboundMessage::Start(StartInfo { total: Some(total) });
            }
        }
        OutboundMessage::Info(payload)
    }

    /// Finish the run; returns the `complete` message to send with ack
    pub fn complete(&mut self, result: Option<Value>) -> OutboundMessage {
        self.emit(ClientEvent::Complete {
            counters: self.counters,
        });
        OutboundMessage::Complete(result.unwrap_or_else(|| json!({})))
    }

    /// Build the `karma_error` message for an uncaught error
    pub fn error(&self, report: &ErrorReport) -> OutboundMessage {
        OutboundMessage::KarmaError(ErrorMessage::new(report.format_message()))
    }

    fn emit(&self, event: ClientEvent) {
        // Nobody took the receiver, or the observer went away. Fine.
        let _ = self.events.send(event);
    }
}

/// Materialize list-like fields as plain arrays
///
/// Results crossing the host platform boundary may carry special
/// array-like objects (`{"0": ..., "1": ..., "length": 2}`); the server
/// expects real arrays.
fn normalize_result(raw: Value) -> Value {
    match raw {
        Value::Object(fields) => {
            let mut normalized = Map::with_capacity(fields.len());
            for (name, value) in fields {
                normalized.insert(name, materialize_array_like(value));
            }
            Value::Object(normalized)
        }
        other => other,
    }
}

/// Convert an array-like object into an array; everything else passes
/// through untouched
fn materialize_array_like(value: Value) -> Value {
    let Value::Object(fields) = value else {
        return value;
    };
    let Some(len) = fields.get("length").and_then(Value::as_u64) else {
        return Value::Object(fields);
    };
    // An array-like object carries one entry per index plus `length`
    // itself. `length` is framework-supplied data; check it against the
    // field count before trusting it for an allocation.
    let Ok(len) = usize::try_from(len) else {
        return Value::Object(fields);
    };
    if len >= fields.len() {
        return Value::Object(fields);
    }

    let mut items = Vec::with_capacity(len);
    for index in 0..len {
        match fields.get(index.to_string().as_str()) {
            Some(item) => items.push(item.clone()),
            // Holes mean it was not array-like after all.
            None => return Value::Object(fields),
        }
    }
    Value::Array(items)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn aggregator() -> (ResultAggregator, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ResultAggregator::new(tx), rx)
    }

    #[test]
    fn counts_each_outcome_exactly_once() {
        let (mut agg, mut rx) = aggregator();
        agg.begin_run();

        agg.report(json!({"skipped": true}));
        agg.report(json!({"success": true}));
        agg.report(json!({"success": true}));
        agg.report(json!({"success": false}));

        let counters = agg.counters();
        assert_eq!(counters.skipped, 1);
        assert_eq!(counters.success, 2);
        assert_eq!(counters.failed, 1);
        assert_eq!(counters.completed(), 4);

        // Last progress notification reports the full count.
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(ClientEvent::Result {
                completed: 4,
                total: None
            })
        );
    }

    #[test]
    fn skipped_takes_priority_over_success() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        agg.report(json!({"skipped": true, "success": true}));
        assert_eq!(agg.counters().skipped, 1);
        assert_eq!(agg.counters().success, 0);
    }

    #[test]
    fn first_result_synthesizes_start_with_unknown_total() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();

        let messages = agg.report(json!({"success": true}));
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            messages[0],
            OutboundMessage::Start(StartInfo { total: None })
        ));
        assert!(matches!(messages[1], OutboundMessage::Result(_)));

        // Only once per run.
        let messages = agg.report(json!({"success": true}));
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], OutboundMessage::Result(_)));
    }

    #[test]
    fn info_with_total_becomes_the_start_signal() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();

        let message = agg.info(json!({"total": 12}));
        assert!(matches!(
            message,
            OutboundMessage::Start(StartInfo { total: Some(12) })
        ));
        assert_eq!(agg.counters().total, Some(12));

        // No second start for the first result.
        let messages = agg.report(json!({"success": true}));
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], OutboundMessage::Result(_)));
    }

    #[test]
    fn info_without_total_is_forwarded() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        let message = agg.info(json!({"dump": "hello"}));
        assert!(matches!(message, OutboundMessage::Info(_)));
        assert_eq!(agg.counters().total, None);
    }

    #[test]
    fn info_after_start_is_forwarded_even_with_total() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        agg.report(json!({"success": true}));
        let message = agg.info(json!({"total": 5}));
        assert!(matches!(message, OutboundMessage::Info(_)));
    }

    #[test]
    fn complete_defaults_to_empty_payload_and_emits_final_counters() {
        let (mut agg, mut rx) = aggregator();
        agg.begin_run();
        agg.report(json!({"success": true}));

        let message = agg.complete(None);
        match message {
            OutboundMessage::Complete(payload) => assert_eq!(payload, json!({})),
            other => panic!("expected complete, got {other:?}"),
        }

        let mut complete = None;
        while let Ok(event) = rx.try_recv() {
            if let ClientEvent::Complete { counters } = event {
                complete = Some(counters);
            }
        }
        assert_eq!(complete.unwrap().success, 1);
    }

    #[test]
    fn materializes_array_like_fields_as_arrays() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        let messages = agg.report(json!({
            "success": true,
            "log": {"0": "line one", "1": "line two", "length": 2},
            "suite": ["outer", "inner"],
        }));
        let result = match messages.last().unwrap() {
            OutboundMessage::Result(value) => value,
            other => panic!("expected result, got {other:?}"),
        };
        assert_eq!(result["log"], json!(["line one", "line two"]));
        assert_eq!(result["suite"], json!(["outer", "inner"]));
    }

    #[test]
    fn objects_with_holes_are_not_treated_as_array_like() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        let messages = agg.report(json!({
            "success": true,
            "meta": {"0": "a", "length": 2},
        }));
        let result = match messages.last().unwrap() {
            OutboundMessage::Result(value) => value,
            other => panic!("expected result, got {other:?}"),
        };
        assert_eq!(result["meta"], json!({"0": "a", "length": 2}));
    }

    #[test]
    fn oversized_length_claims_pass_through_untouched() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        let messages = agg.report(json!({
            "success": true,
            "log": {"length": u64::MAX},
        }));
        let result = match messages.last().unwrap() {
            OutboundMessage::Result(value) => value,
            other => panic!("expected result, got {other:?}"),
        };
        assert_eq!(result["log"], json!({"length": u64::MAX}));
    }

    #[test]
    fn length_exceeding_the_field_count_is_not_array_like() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        let messages = agg.report(json!({
            "success": true,
            "meta": {"0": "a", "1": "b", "length": 40},
        }));
        let result = match messages.last().unwrap() {
            OutboundMessage::Result(value) => value,
            other => panic!("expected result, got {other:?}"),
        };
        assert_eq!(result["meta"], json!({"0": "a", "1": "b", "length": 40}));
    }

    #[test]
    fn counters_past_the_announced_total_are_not_clamped() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        agg.info(json!({"total": 1}));
        agg.report(json!({"success": true}));
        agg.report(json!({"success": true}));
        // Reported as a defect (logged), never clamped.
        assert_eq!(agg.counters().completed(), 2);
    }

    // Results are not tagged with a run id, so a result arriving after a
    // reset merges into the new run.
    #[test]
    fn late_results_merge_into_the_new_run() {
        let (mut agg, _rx) = aggregator();
        agg.begin_run();
        agg.report(json!({"success": true}));

        agg.begin_run();
        assert_eq!(agg.counters().completed(), 0);

        agg.report(json!({"failed": true}));
        assert_eq!(agg.counters().failed, 1);
        assert_eq!(agg.counters().completed(), 1);
    }
}
