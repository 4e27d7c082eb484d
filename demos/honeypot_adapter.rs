// Illustrative domain consumer, not part of the library surface: a
// honeypot event analyzer built on top of `seqflow::Engine`. Routes
// records by a `DataType` field to a relevant rule subset, tracks an
// `EventItem` as the action payload across a session's chained records,
// and "persists" confirmed (critical) events to a sink once a
// rule marked `IsCritical` fires.
//
// Grounded loosely on the original honeypot adapter's DataType-keyed
// rule dictionary and EventItem bookkeeping; the taint-propagation
// blacklist machinery and MongoDB persistence are left out, since this
// demo exists to show how an application wires itself to the engine,
// not to reproduce that system end to end.

use seqflow::{Engine, FieldMatchSpec, FieldValue, Payload, Record, Rule};
use std::sync::{Arc, Mutex};

/// Application-level payload installed alongside a chained flag: one
/// event under construction (or already confirmed) for a honeypot
/// session.
#[derive(Debug, Clone)]
struct EventItem {
    honey_id: i64,
    session_id: String,
    process_name: String,
    attack_type: String,
    level: i64,
    content_lines: Vec<String>,
    confirmed: bool,
}

impl EventItem {
    fn new(honey_id: i64, session_id: impl Into<String>, process_name: impl Into<String>, attack_type: impl Into<String>) -> Self {
        EventItem {
            honey_id,
            session_id: session_id.into(),
            process_name: process_name.into(),
            attack_type: attack_type.into(),
            level: 0,
            content_lines: Vec::new(),
            confirmed: false,
        }
    }

    fn append_line(&mut self, line: String) {
        self.content_lines.push(line);
    }
}

/// Rule metadata this demo reads out of `Rule::extra` beyond what the
/// core engine understands: `DataType` for routing, `ContentLine` for
/// the human-readable audit line, `IsCritical`/`Level`/`AttackType` for
/// event confirmation.
fn rule_data_type(rule: &Rule) -> Option<String> {
    rule.extra_str("DataType").map(str::to_string)
}

/// Splits the full rule set into per-DataType buckets once, the way the
/// original adapter partitions its rule list at construction instead of
/// scanning the whole set per record.
fn bucket_rules_by_data_type(rules: &[Rule]) -> std::collections::HashMap<String, Vec<Rule>> {
    let mut buckets: std::collections::HashMap<String, Vec<Rule>> = std::collections::HashMap::new();
    for rule in rules {
        if let Some(data_type) = rule_data_type(rule) {
            buckets.entry(data_type).or_default().push(rule.clone());
        }
    }
    buckets
}

/// Sink confirmed events land in. A real deployment would write to a
/// database here; this demo just accumulates them for inspection.
#[derive(Default)]
struct EventSink {
    confirmed: Mutex<Vec<EventItem>>,
}

impl EventSink {
    fn persist(&self, event: EventItem) {
        println!(
            "[honeypot] confirmed event: honey={} session={} attack={} level={}",
            event.honey_id, event.session_id, event.attack_type, event.level
        );
        self.confirmed.lock().unwrap().push(event);
    }
}

fn record_data_type(record: &Record) -> Option<String> {
    match record.get("DataType") {
        Some(FieldValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

fn record_str(record: &Record, field: &str) -> String {
    match record.get(field) {
        Some(v) => v.render_as_text(seqflow::ByteDecoding::Utf16Le),
        None => String::new(),
    }
}

fn record_i64(record: &Record, field: &str) -> i64 {
    match record.get(field) {
        Some(v) => v.parse_i64().unwrap_or(0),
        None => 0,
    }
}

fn main() {
    env_logger::init();

    let rules = vec![
        // Entry-point rule: a new sample dropped by a session. Opens an
        // EventItem and flags the session as tainted.
        Rule::new()
            .with_name("sample_dropped")
            .with_field(FieldMatchSpec::new("OpCode", 1i64, 1))
            .with_current_flag("taint:{SessionID}")
            .with_extra("DataType", "SampleInfo")
            .with_extra("ContentLine", "sample dropped by {ProcessName}")
            .with_extra("AttackType", "dropper")
            .with_extra("Level", 2)
            .with_extra("IsCritical", false),
        // Follow-up rule: the tainted session spawns a child process.
        // Confirms the event as critical.
        Rule::new()
            .with_name("tainted_process_spawn")
            .with_field(FieldMatchSpec::new("OpCode", 0i64, 1))
            .with_prev_flag("taint:{SessionID}")
            .with_current_flag("taint:{SessionID}")
            .with_extra("DataType", "ProcInfo")
            .with_extra("ContentLine", "tainted session spawned {OpProcessName}")
            .with_extra("AttackType", "lateral-movement")
            .with_extra("Level", 5)
            .with_extra("IsCritical", true),
    ];

    let buckets = bucket_rules_by_data_type(&rules);
    let engine = Engine::new(rules).expect("rule set has no duplicate plugin names");
    let sink = Arc::new(EventSink::default());

    let action = {
        let sink = sink.clone();
        move |record: &Record, rule: &Rule, prior: Option<Payload>, current_flag: &str| -> Option<Payload> {
            let mut event = match prior.and_then(|p| p.downcast::<Mutex<EventItem>>().ok()) {
                Some(existing) => {
                    let locked = existing.lock().unwrap().clone();
                    locked
                }
                None => EventItem::new(
                    record_i64(record, "HoneyID"),
                    record_str(record, "SessionID"),
                    record_str(record, "ProcessName"),
                    rule.extra_str("AttackType").unwrap_or("").to_string(),
                ),
            };

            if let Some(line) = rule.extra_str("ContentLine") {
                event.append_line(line.to_string());
            }

            let is_critical = rule.extra.get("IsCritical").and_then(|v| v.as_bool()).unwrap_or(false);
            if is_critical {
                event.level = rule.extra_i64("Level").unwrap_or(event.level);
                event.confirmed = true;
                sink.persist(event.clone());
            }

            log::info!(target: "honeypot", "flag {current_flag:?} tracking session {}", event.session_id);
            Some(Arc::new(Mutex::new(event)))
        }
    };

    let mut sample_dropped = Record::new();
    sample_dropped
        .insert("DataType", "SampleInfo")
        .insert("OpCode", 1i64)
        .insert("HoneyID", 7i64)
        .insert("SessionID", "s-1001")
        .insert("ProcessName", "svchost.exe");

    let mut child_spawned = Record::new();
    child_spawned
        .insert("DataType", "ProcInfo")
        .insert("OpCode", 0i64)
        .insert("HoneyID", 7i64)
        .insert("SessionID", "s-1001")
        .insert("OpProcessName", "cmd.exe");

    let samples = vec![sample_dropped, child_spawned];

    for mut record in samples {
        let Some(data_type) = record_data_type(&record) else {
            continue;
        };
        let subset = match buckets.get(&data_type) {
            Some(subset) => subset.as_slice(),
            None => continue,
        };
        engine.analyse(&mut record, Some(&action), Some(subset));
    }

    let confirmed = sink.confirmed.lock().unwrap();
    println!("total confirmed events: {}", confirmed.len());
}
