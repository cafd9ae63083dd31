//! End-to-end renderer scenarios over the in-memory DOM.
//!
//! - Batching: many mutations, one commit pass, one render
//! - Change detection by structural equality
//! - Max-FPS throttling on a deterministic clock
//! - Per-mutation failure and completion semantics
//! - Events, notifications and persisted sub-state

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use opcut_core::{Value, ops, path};
use opcut_runtime::{
    DeterministicClock, MemoryStorage, PersistedPath, Phase, Renderer, RendererConfig,
    RendererError, StorageBackend,
};
use opcut_vdom::{Data, Description, MemoryDom, h};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

type TestRenderer = Renderer<MemoryDom, DeterministicClock>;

fn renderer(config: RendererConfig) -> TestRenderer {
    Renderer::headless(DeterministicClock::new(), config)
}

fn json(value: serde_json::Value) -> Value {
    Value::from(value)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn count_view(state: &Value) -> Description {
    let count = ops::get_or_null(&path!["count"], state);
    h("p").child(count.to_string()).into()
}

fn increment(v: &Value) -> Value {
    Value::from(v.as_f64().unwrap_or(0.0) + 1.0)
}

fn html(r: &TestRenderer) -> String {
    r.dom().inner_html(r.dom().body())
}

fn counter(r: &mut TestRenderer) -> Rc<RefCell<usize>> {
    let renders = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&renders);
    r.on_rendered(move |_| *seen.borrow_mut() += 1);
    renders
}

// ============================================================================
// Batching and change detection
// ============================================================================

#[test]
fn three_increments_commit_and_render_once() {
    let mut r = renderer(RendererConfig::default());
    let _ = r.init(json(json!({"count": 0})), count_view);
    r.run_until_idle().unwrap();
    assert_eq!(html(&r), "<p>0</p>");
    let renders = counter(&mut r);

    let handle = r.handle();
    let done: Vec<_> = (0..3)
        .map(|_| handle.change(path!["count"], increment))
        .collect();
    assert_eq!(r.phase(), Phase::MutationQueued);

    r.clock_mut().advance(ms(100));
    let step = r.step().unwrap();
    assert_eq!(step.committed, 3);
    assert!(step.rendered);
    assert_eq!(*renders.borrow(), 1);
    assert_eq!(r.frame_idx(), 2);
    assert_eq!(html(&r), "<p>3</p>");
    assert!(done.iter().all(|c| c.result() == Some(Ok(()))));
}

#[test]
fn equal_set_produces_no_render() {
    let mut r = renderer(RendererConfig::default());
    let _ = r.init(json(json!({"a": {"b": 5}})), |s: &Value| h("p").child(s.to_string()).into());
    r.run_until_idle().unwrap();
    let renders = counter(&mut r);
    let changes = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&changes);
    r.on_changed(move |_| *seen.borrow_mut() += 1);

    let same_leaf = r.set(path!["a", "b"], 5);
    let same_object = r.set(path!["a"], json(json!({"b": 5})));
    let report = r.flush();
    assert_eq!(report.applied, 2);
    assert!(!report.changed);
    assert_eq!(r.phase(), Phase::Idle);
    assert_eq!(same_leaf.result(), Some(Ok(())));
    assert_eq!(same_object.result(), Some(Ok(())));

    r.run_until_idle().unwrap();
    assert_eq!(*renders.borrow(), 0);
    assert_eq!(*changes.borrow(), 0);
}

#[test]
fn setting_null_where_nothing_was_is_a_change() {
    let mut r = renderer(RendererConfig::default());
    let _ = r.init_state(json(json!({})));
    r.flush();
    let _ = r.set(path!["x"], Value::Null);
    assert!(r.flush().changed);
    assert_eq!(r.get(path!["x"]), Some(Value::Null));
}

#[test]
fn changed_fires_before_rendered() {
    let mut r = renderer(RendererConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));
    let (a, b) = (Rc::clone(&log), Rc::clone(&log));
    r.on_changed(move |_| a.borrow_mut().push("changed"));
    let id = r.on_rendered(move |_| b.borrow_mut().push("rendered"));

    let _ = r.init(json(json!({"count": 1})), count_view);
    r.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), ["changed", "rendered"]);

    assert!(r.unsubscribe(id));
    let _ = r.change(path!["count"], increment);
    r.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), ["changed", "rendered", "changed"]);
}

#[test]
fn state_only_renderer_never_touches_the_dom() {
    let mut r = renderer(RendererConfig::default());
    let done = r.init_state(json(json!({"count": 0})));
    let step = r.step().unwrap();
    assert_eq!(step.committed, 1);
    assert!(!step.rendered);
    assert_eq!(done.result(), Some(Ok(())));
    assert_eq!(r.dom().created_count(), 0);
}

// ============================================================================
// Throttling
// ============================================================================

#[test]
fn max_fps_coalesces_mutations_into_one_delayed_render() {
    let mut r = renderer(RendererConfig::default().with_max_fps(2));
    let _ = r.init(json(json!({"count": 0})), count_view);
    r.run_until_idle().unwrap();
    assert_eq!(r.frame_idx(), 1);

    r.clock_mut().set(ms(400));
    let first = r.set(path!["count"], 1);
    let step = r.step().unwrap();
    assert_eq!(step.committed, 1);
    assert!(!step.rendered);
    assert_eq!(step.phase, Phase::RenderScheduled);
    assert_eq!(r.next_deadline(), Some(ms(500)));

    r.clock_mut().set(ms(450));
    let second = r.set(path!["count"], 2);
    assert!(!r.step().unwrap().rendered);
    assert_eq!(r.next_deadline(), Some(ms(500)));
    assert!(!first.is_settled());
    assert_eq!(html(&r), "<p>0</p>");

    r.clock_mut().set(ms(500));
    assert!(r.step().unwrap().rendered);
    assert_eq!(r.frame_idx(), 2);
    assert_eq!(html(&r), "<p>2</p>");
    assert_eq!(first.result(), Some(Ok(())));
    assert_eq!(second.result(), Some(Ok(())));
    assert_eq!(r.next_deadline(), None);
}

#[test]
fn mutation_after_a_long_pause_renders_immediately() {
    let mut r = renderer(RendererConfig::default().with_max_fps(2));
    let _ = r.init(json(json!({"count": 0})), count_view);
    r.run_until_idle().unwrap();

    r.clock_mut().advance(ms(2_000));
    let _ = r.change(path!["count"], increment);
    assert!(r.step().unwrap().rendered);
    assert_eq!(html(&r), "<p>1</p>");
}

#[test]
fn unthrottled_renderer_renders_every_step() {
    let mut r = renderer(RendererConfig::default().without_throttle());
    let _ = r.init(json(json!({"count": 0})), count_view);
    r.run_until_idle().unwrap();
    for expected in 1..=3 {
        let _ = r.change(path!["count"], increment);
        assert!(r.step().unwrap().rendered);
        assert_eq!(html(&r), format!("<p>{expected}</p>"));
    }
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn failed_mutations_do_not_roll_back_the_batch() {
    let mut r = renderer(RendererConfig::default());
    let _ = r.init_state(json(json!({"a": {"x": 1}, "list": [1]})));
    r.flush();

    let ok_before = r.set(path!["b"], 1);
    let bad_path = r.set(path!["list", "k"], 2);
    let ok_after = r.set(path!["c"], 3);
    let rejected = r.try_change(path!["a", "x"], |_| Err::<Value, _>("negative width"));

    let report = r.flush();
    assert_eq!((report.applied, report.failed), (2, 2));
    assert!(report.changed);
    assert_eq!(ok_before.result(), Some(Ok(())));
    assert_eq!(ok_after.result(), Some(Ok(())));
    assert!(matches!(
        bad_path.result(),
        Some(Err(RendererError::InvalidPath(_)))
    ));
    assert_eq!(
        rejected.result(),
        Some(Err(RendererError::MutationFailure("negative width".into())))
    );
    assert_eq!(
        r.state(),
        json(json!({"a": {"x": 1}, "list": [1], "b": 1, "c": 3}))
    );
}

#[test]
fn invalid_view_fails_the_render_and_its_completions() {
    let mut r = renderer(RendererConfig::default());
    let done = r.init(json(json!({"count": 0})), |_| Data::new().into());
    let err = r.step().unwrap_err();
    assert!(matches!(err, RendererError::Build(_)));
    assert_eq!(done.result(), Some(Err(err)));
    assert_eq!(r.phase(), Phase::Idle);
    assert_eq!(r.get(path!["count"]), Some(Value::from(0)));
}

#[test]
fn completion_is_a_future() {
    let mut r = renderer(RendererConfig::default().without_throttle());
    let _ = r.init(json(json!({"count": 0})), count_view);
    r.run_until_idle().unwrap();

    let mut done = r.change(path!["count"], increment);
    let mut cx = Context::from_waker(Waker::noop());
    assert_eq!(Pin::new(&mut done).poll(&mut cx), Poll::Pending);
    r.run_until_idle().unwrap();
    assert_eq!(Pin::new(&mut done).poll(&mut cx), Poll::Ready(Ok(())));
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn click_listener_enqueues_through_a_handle() {
    let mut r = renderer(RendererConfig::default().without_throttle());
    let handle = r.handle();
    let _ = r.init(json(json!({"clicks": 0})), move |state| {
        let handle = handle.clone();
        let clicks = ops::get_or_null(&path!["clicks"], state);
        h("button")
            .data(Data::new().on("click", move |_| {
                let _ = handle.change(path!["clicks"], increment);
            }))
            .child(clicks.to_string())
            .into()
    });
    r.run_until_idle().unwrap();
    assert_eq!(html(&r), "<button>0</button>");

    let button = r.root_nodes()[0];
    assert!(r.dispatch_event(button, "click", Value::Null));
    assert!(!r.dispatch_event(button, "keydown", Value::Null));
    assert_eq!(r.phase(), Phase::MutationQueued);
    r.run_until_idle().unwrap();
    assert_eq!(html(&r), "<button>1</button>");
    assert_eq!(r.root_nodes(), [button]);
}

#[test]
fn input_event_payload_reaches_the_state() {
    let mut r = renderer(RendererConfig::default());
    let handle = r.handle();
    let _ = r.init(json(json!({"width": ""})), move |state| {
        let handle = handle.clone();
        let width = ops::get_or_null(&path!["width"], state);
        h("input")
            .data(Data::new().prop("value", width).on("change", move |event| {
                if let Some(value) = event.value() {
                    let _ = handle.set(path!["width"], value.clone());
                }
            }))
            .into()
    });
    r.run_until_idle().unwrap();

    let input = r.root_nodes()[0];
    r.dispatch_event(input, "change", json(json!({"value": "120"})));
    r.run_until_idle().unwrap();
    assert_eq!(r.get(path!["width"]), Some(Value::from("120")));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn persisted_settings_restore_and_save_on_change() {
    let storage = Rc::new(MemoryStorage::with_entries([(
        "opcut.settings",
        r#"{"unit":"mm"}"#,
    )]));
    let binding = PersistedPath::new("opcut.settings", path!["settings"]);
    let initial = binding.restore(
        storage.as_ref(),
        &json(json!({"settings": {"unit": "cm"}, "result": null})),
    );

    let mut r = renderer(RendererConfig::default());
    let _ = r.init_state(initial);
    r.flush();
    assert_eq!(r.get(path!["settings", "unit"]), Some(Value::from("mm")));

    r.persist(binding, storage.clone());
    let _ = r.set(path!["result"], 5);
    r.flush();
    assert_eq!(
        storage.load("opcut.settings").unwrap().as_deref(),
        Some(r#"{"unit":"mm"}"#)
    );

    let _ = r.set(path!["settings", "unit"], "in");
    r.flush();
    assert_eq!(
        storage.load("opcut.settings").unwrap().as_deref(),
        Some(r#"{"unit":"in"}"#)
    );
}

// ============================================================================
// Property tests
// ============================================================================

fn set_ops() -> impl Strategy<Value = Vec<(usize, usize, i32)>> {
    prop::collection::vec((0usize..3, 0usize..3, -5i32..5), 0..12)
}

const KEYS: [&str; 3] = ["a", "b", "c"];

proptest! {
    #[test]
    fn batched_commit_equals_one_at_a_time(ops_list in set_ops()) {
        let seed = json(json!({"a": {}, "b": {"a": 0}}));
        let mut batched = renderer(RendererConfig::default());
        let mut sequential = renderer(RendererConfig::default());
        let _ = batched.init_state(seed.clone());
        let _ = sequential.init_state(seed.clone());
        batched.flush();
        sequential.flush();

        let mut expected = seed;
        for &(outer, inner, n) in &ops_list {
            let p = path![KEYS[outer], KEYS[inner]];
            let _ = batched.set(p.clone(), n);
            let _ = sequential.set(p.clone(), n);
            sequential.flush();
            expected = ops::set(&p, &expected, Value::from(n)).unwrap();
        }
        let report = batched.flush();
        prop_assert_eq!(report.applied, ops_list.len());
        prop_assert_eq!(batched.state(), sequential.state());
        prop_assert_eq!(batched.state(), expected);
    }
}
