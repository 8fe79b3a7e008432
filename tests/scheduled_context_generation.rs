//! End-to-end checks of generated "scheduled with context in scope" families.
//!
//! Each test wires a real [`ParallelScheduler`] to a fresh registry, generates
//! the family for one operator, and drives it through `run_all` or directly
//! through the case entry points.

#[macro_use]
mod common;

use common::*;
use ctxscope::scheduler::{HookRegistry, Scheduler, Task};
use ctxscope::tck::{
    install, plan_variants, run_all, scoped_context, Companion, DynamicTest, TestStatus,
    CAPTURE_DEFAULT, CONTEXT_FALLBACK, CONTEXT_VALUE,
};
use ctxscope::{
    generate_scheduled_with_context_tests, generate_simple_scheduled_with_context_tests, Sequence,
    StepVerifier, VerifierOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn publish_on_over_fusable_source_generates_boxed_and_fused() {
    init_test_logging();
    test_phase!("publish_on_over_fusable_source_generates_boxed_and_fused");

    let registry = test_registry();
    let scheduler = test_scheduler("publishOn", 2, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let tests: Vec<DynamicTest> = generate_simple_scheduled_with_context_tests(
        &registry,
        "publishOn",
        || Sequence::from_iter(vec![1, 2, 3]),
        move |source: Sequence<i32>| source.publish_on(Arc::clone(&hop)),
        expect_customized(vec![1, 2, 3]),
    )
    .collect();

    test_section!("run family");
    let report = run_all(tests);
    assert_report_passed!(
        report,
        [
            "publishOnScheduledWithContextInScope",
            "publishOnScheduledWithContextInScope_fused"
        ]
    );
    test_complete!(
        "publish_on_over_fusable_source_generates_boxed_and_fused",
        passed = report.passed()
    );
}

#[test]
fn filter_over_non_fusable_source_generates_one_case() {
    init_test_logging();
    test_phase!("filter_over_non_fusable_source_generates_one_case");

    let registry = test_registry();
    let tests: Vec<DynamicTest> = generate_simple_scheduled_with_context_tests(
        &registry,
        "filter",
        || {
            Sequence::create(|emitter| {
                for i in 1..=4 {
                    emitter.next(i);
                }
            })
        },
        |source: Sequence<i32>| source.filter(|v| v % 2 == 0),
        |case| {
            case.raw_test()?
                .expect_next_sequence([2, 4])
                .verify_complete()?;
            Ok(())
        },
    )
    .collect();

    let names: Vec<_> = tests.iter().map(|t| t.name().to_string()).collect();
    assert_with_log!(
        names == ["filterScheduledWithContextInScope"],
        "single variant",
        ["filterScheduledWithContextInScope"],
        names
    );
    let report = run_all(tests);
    assert!(report.all_passed(), "{:?}", report.records);
    test_complete!("filter_over_non_fusable_source_generates_one_case");
}

#[test]
fn boxed_publish_on_propagates_context_per_signal() {
    init_test_logging();
    test_phase!("boxed_publish_on_propagates_context_per_signal");

    let registry = test_registry();
    let scheduler = test_scheduler("boxed", 3, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let cases = plan_variants(
        &registry,
        "publishOn",
        || (),
        |_| Sequence::create(|emitter| (1..=5).for_each(|i| emitter.next(i))),
        move |source: Sequence<i32>, _| source.publish_on(Arc::clone(&hop)),
    );
    assert_eq!(cases.len(), 1);
    let case = &cases[0];

    case.mapping_test()
        .expect("prepared")
        .then_consume_while(|item: &String| item.ends_with(CONTEXT_VALUE))
        .verify_complete()
        .expect("every item observed the propagated value");

    assert_capture_cleared(case, &scheduler);
    test_complete!("boxed_publish_on_propagates_context_per_signal");
}

#[test]
fn capture_cells_return_to_default_after_each_variant() {
    init_test_logging();
    test_phase!("capture_cells_return_to_default_after_each_variant");

    let registry = test_registry();
    let scheduler = test_scheduler("cleanup", 2, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let cases = plan_variants(
        &registry,
        "publishOn",
        || (),
        |_| Sequence::from_iter(0..10),
        move |source: Sequence<i32>, _| source.publish_on(Arc::clone(&hop)),
    );
    assert_eq!(cases.len(), 2);

    for case in &cases {
        test_section!(case.name());
        case.mapping_test()
            .expect("prepared")
            .expect_next_count(10)
            .verify_complete()
            .expect("verified");
    }
    for case in &cases {
        assert_capture_cleared(case, &scheduler);
        assert_eq!(case.companion().capture().occupied(), 0);
    }
    test_complete!("capture_cells_return_to_default_after_each_variant");
}

#[test]
fn custom_resource_is_preserved_per_variant() {
    init_test_logging();
    test_phase!("custom_resource_is_preserved_per_variant");

    let registry = test_registry();
    let supplied = Arc::new(parking_lot::Mutex::new(Vec::<Arc<AtomicUsize>>::new()));
    let log = Arc::clone(&supplied);

    let cases = plan_variants(
        &registry,
        "map",
        move || {
            let counter = Arc::new(AtomicUsize::new(0));
            log.lock().push(Arc::clone(&counter));
            counter
        },
        |companion: &Arc<Companion<Arc<AtomicUsize>>>| {
            let counter = Arc::clone(companion.resource());
            Sequence::from_iter(vec![1, 2]).map(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                v
            })
        },
        |source: Sequence<i32>, _| source.map(|v| v * 10),
    );

    let supplied = supplied.lock().clone();
    assert_eq!(supplied.len(), 2);
    assert_eq!(cases.len(), 2);
    // The fused variant keeps the first supplied resource.
    assert!(Arc::ptr_eq(cases[1].resource(), &supplied[0]));
    assert!(Arc::ptr_eq(cases[0].resource(), &supplied[1]));
    assert!(!Arc::ptr_eq(cases[0].resource(), cases[1].resource()));

    cases[0]
        .raw_test()
        .expect("prepared")
        .expect_next_sequence([10, 20])
        .verify_complete()
        .expect("boxed variant");
    assert_eq!(cases[0].resource().load(Ordering::SeqCst), 2);
    assert_eq!(cases[1].resource().load(Ordering::SeqCst), 0);
    test_complete!("custom_resource_is_preserved_per_variant");
}

#[test]
fn resource_generator_overload_runs_through_run_all() {
    init_test_logging();
    let registry = test_registry();
    let scheduler = test_scheduler("resources", 1, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let tests = generate_scheduled_with_context_tests(
        &registry,
        "publishOn",
        || String::from("payload"),
        |companion: &Arc<Companion<String>>| {
            Sequence::from_iter(companion.resource().chars().take(2).collect::<Vec<_>>())
        },
        move |source: Sequence<char>, _| source.publish_on(Arc::clone(&hop)),
        |case| {
            assert_eq!(case.resource(), "payload");
            case.mapping_test()?
                .expect_next("pcustomized".to_string())
                .expect_next("acustomized".to_string())
                .verify_complete()?;
            Ok(())
        },
    );
    let report = run_all(tests);
    assert_eq!(report.passed(), 2, "{:?}", report.records);
}

#[test]
fn subscribe_on_generates_single_variant_and_propagates() {
    init_test_logging();
    test_phase!("subscribe_on_generates_single_variant_and_propagates");

    let registry = test_registry();
    let scheduler = test_scheduler("subscribeOn", 2, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let report = run_all(generate_simple_scheduled_with_context_tests(
        &registry,
        "subscribeOn",
        || Sequence::from_iter(vec![7, 8]),
        move |source: Sequence<i32>| source.subscribe_on(Arc::clone(&hop)),
        expect_customized(vec![7, 8]),
    ));
    assert_report_passed!(report, ["subscribeOnScheduledWithContextInScope"]);
    test_complete!("subscribe_on_generates_single_variant_and_propagates");
}

#[test]
fn missing_context_key_captures_fallback() {
    init_test_logging();
    let registry = test_registry();
    let scheduler = test_scheduler("fallback", 1, &registry).expect("scheduler");
    let companion = Arc::new(Companion::new(()));
    install(&registry, "fallback", &companion);

    let reader = Arc::clone(&companion);
    let sequence = Sequence::from_iter(vec![1])
        .hide()
        .publish_on(as_dyn(&scheduler))
        .map(move |v| format!("{v}{}", reader.capture().get()));
    StepVerifier::create(sequence, VerifierOptions::create())
        .expect_next(format!("1{CONTEXT_FALLBACK}"))
        .verify_complete()
        .expect("fallback observed");
}

#[test]
fn unhooked_work_sees_default_capture() {
    init_test_logging();
    let registry = test_registry();
    let scheduler = test_scheduler("unhooked", 1, &registry).expect("scheduler");
    let companion = Arc::new(Companion::new(()));

    let reader = Arc::clone(&companion);
    let sequence = Sequence::from_iter(vec![1])
        .publish_on(as_dyn(&scheduler))
        .map(move |v| format!("{v}{}", reader.capture().get()));
    StepVerifier::create(
        sequence,
        VerifierOptions::create().with_initial_context(scoped_context()),
    )
    .expect_next(format!("1{CAPTURE_DEFAULT}"))
    .verify_complete()
    .expect("no hook, no capture");
}

#[test]
fn installing_b_leaves_work_already_scheduled_under_a_intact() {
    init_test_logging();
    test_phase!("installing_b_leaves_work_already_scheduled_under_a_intact");

    let registry = test_registry();
    let scheduler = test_scheduler("ordering", 1, &registry).expect("scheduler");
    let worker = scheduler.create_worker().expect("worker");
    let first = Arc::new(Companion::new("a"));
    let second = Arc::new(Companion::new("b"));

    // Park the only lane so the next task stays queued.
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let gate: Task = Box::new(move || {
        let _ = release_rx.recv_timeout(Duration::from_secs(5));
    });
    worker.schedule(gate, &scoped_context()).expect("gate");

    install(&registry, "A", &first);
    let (seen_tx, seen_rx) = mpsc::channel();
    let observe_first = Arc::clone(&first);
    let observe_second = Arc::clone(&second);
    worker
        .schedule(
            Box::new(move || {
                let _ = seen_tx.send((
                    observe_first.capture().get(),
                    observe_second.capture().get(),
                ));
            }),
            &scoped_context(),
        )
        .expect("queued under A");

    install(&registry, "B", &second);
    assert_eq!(registry.active_name().as_deref(), Some("B"));
    release_tx.send(()).expect("release");

    let (under_a, under_b) = seen_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("queued work ran");
    assert_eq!(under_a, CONTEXT_VALUE);
    assert_eq!(under_b, CAPTURE_DEFAULT);
    assert_eq!(registry.len(), 2);
    test_complete!("installing_b_leaves_work_already_scheduled_under_a_intact");
}

#[test]
fn registry_clear_isolates_unrelated_runs() {
    init_test_logging();
    let registry = HookRegistry::shared();
    let scheduler = test_scheduler("isolation", 1, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let cases = plan_variants(
        &registry,
        "publishOn",
        || (),
        |_| Sequence::just(1),
        move |source: Sequence<i32>, _| source.publish_on(Arc::clone(&hop)),
    );
    cases[0]
        .mapping_test()
        .expect("prepared")
        .expect_next("1customized".to_string())
        .verify_complete()
        .expect("first run");

    registry.clear();
    assert!(registry.is_empty());
    assert_eq!(registry.active_name(), None);

    // Entry points re-arm, so a cleared registry is not an error.
    cases[1]
        .mapping_test()
        .expect("prepared")
        .expect_next("1customized".to_string())
        .verify_complete()
        .expect("second run");
    assert_eq!(registry.len(), 1);
}

#[test]
fn failing_executor_is_reported_not_propagated() {
    init_test_logging();
    let registry = test_registry();
    let scheduler = test_scheduler("failures", 1, &registry).expect("scheduler");
    let hop = as_dyn(&scheduler);

    let report = run_all(generate_simple_scheduled_with_context_tests(
        &registry,
        "publishOn",
        || Sequence::from_iter(vec![1]),
        move |source: Sequence<i32>| source.publish_on(Arc::clone(&hop)),
        |case| {
            case.mapping_test()?
                .expect_next("1none".to_string())
                .verify_complete()?;
            Ok(())
        },
    ));

    assert_eq!(report.failed(), 2);
    for record in &report.records {
        assert_eq!(record.status, TestStatus::Failed);
        let message = record.message.as_deref().unwrap_or_default();
        assert!(message.contains("1customized"), "{message}");
        assert!(message.contains(&record.name), "{message}");
    }

    let json = report.to_json().expect("json");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(parsed["records"].as_array().map(Vec::len), Some(2));
}
