//! Fast-path check and variant planning.
//!
//! A stage that takes part in the fused protocol may bypass its normal
//! per-signal scheduling when its upstream is fusable too. Both paths must
//! carry the subscription context across the scheduler hop, so when the check
//! reports that source and operator are both fusable the family gets a boxed
//! variant (source hidden) and a fused variant. Otherwise it gets one.

use super::case::{PipelineFactory, ScheduledContextCase};
use super::companion::Companion;
use super::dynamic::{DynamicTest, TestOutcome};
use crate::flow::Sequence;
use crate::scheduler::HookRegistry;
use std::fmt;
use std::sync::Arc;

/// Suffix appended to the operator name to form the base variant name.
pub const TEST_NAME_SUFFIX: &str = "ScheduledWithContextInScope";
/// Suffix appended to the base name for the fused variant.
pub const FUSED_SUFFIX: &str = "_fused";

/// Base variant name for `operator_name`.
#[must_use]
pub fn base_name(operator_name: &str) -> String {
    format!("{operator_name}{TEST_NAME_SUFFIX}")
}

/// Fused variant name for `operator_name`.
#[must_use]
pub fn fused_name(operator_name: &str) -> String {
    format!("{}{FUSED_SUFFIX}", base_name(operator_name))
}

/// Assembles a sample pipeline once and returns the variants to run, boxed first.
///
/// `resource_supplier` is called once per variant. The sample pipeline is
/// built with the first companion and dropped without being subscribed; the
/// returned cases always assemble fresh pipelines.
pub fn plan_variants<R, S, T, Sup, G, Op>(
    registry: &Arc<HookRegistry>,
    operator_name: &str,
    mut resource_supplier: Sup,
    source_generator: G,
    operator_under_test: Op,
) -> Vec<ScheduledContextCase<T, R>>
where
    R: Send + Sync + 'static,
    S: Send + 'static,
    T: fmt::Debug + Send + 'static,
    Sup: FnMut() -> R,
    G: Fn(&Arc<Companion<R>>) -> Sequence<S> + Send + Sync + 'static,
    Op: Fn(Sequence<S>, &Arc<Companion<R>>) -> Sequence<T> + Send + Sync + 'static,
{
    let test_name = base_name(operator_name);
    let source_generator = Arc::new(source_generator);
    let operator_under_test = Arc::new(operator_under_test);
    let main = Arc::new(Companion::new(resource_supplier()));

    let (source_fusable, pipeline_fusable) = {
        let sample_source = source_generator(&main);
        let source_fusable = sample_source.supports_fast_path();
        let sample = operator_under_test(sample_source, &main);
        (source_fusable, sample.supports_fast_path())
    };
    tracing::debug!(
        operator = %operator_name,
        source_fusable,
        pipeline_fusable,
        "checked fast path"
    );

    let main_factory = factory(
        Arc::clone(&source_generator),
        Arc::clone(&operator_under_test),
        Arc::clone(&main),
        false,
    );

    if source_fusable && pipeline_fusable {
        let hidden = Arc::new(Companion::new(resource_supplier()));
        let hidden_factory = factory(
            source_generator,
            operator_under_test,
            Arc::clone(&hidden),
            true,
        );
        return vec![
            ScheduledContextCase::new(
                test_name.clone(),
                hidden_factory,
                hidden,
                Arc::clone(registry),
            ),
            ScheduledContextCase::new(
                format!("{test_name}{FUSED_SUFFIX}"),
                main_factory,
                main,
                Arc::clone(registry),
            ),
        ];
    }

    vec![ScheduledContextCase::new(
        test_name,
        main_factory,
        main,
        Arc::clone(registry),
    )]
}

fn factory<R, S, T, G, Op>(
    source_generator: Arc<G>,
    operator_under_test: Arc<Op>,
    companion: Arc<Companion<R>>,
    hide_source: bool,
) -> PipelineFactory<T>
where
    R: Send + Sync + 'static,
    S: Send + 'static,
    T: Send + 'static,
    G: Fn(&Arc<Companion<R>>) -> Sequence<S> + Send + Sync + 'static,
    Op: Fn(Sequence<S>, &Arc<Companion<R>>) -> Sequence<T> + Send + Sync + 'static,
{
    Arc::new(move || {
        let source = source_generator(&companion);
        let source = if hide_source { source.hide() } else { source };
        operator_under_test(source, &companion)
    })
}

/// Generates the test family for `operator_name` as dynamic tests.
///
/// Each generated test hands its [`ScheduledContextCase`] to `executor`,
/// which typically calls [`ScheduledContextCase::mapping_test`] or
/// [`ScheduledContextCase::raw_test`] and verifies the outcome.
pub fn generate_scheduled_with_context_tests<R, S, T, Sup, G, Op, E>(
    registry: &Arc<HookRegistry>,
    operator_name: &str,
    resource_supplier: Sup,
    source_generator: G,
    operator_under_test: Op,
    executor: E,
) -> impl Iterator<Item = DynamicTest>
where
    R: Send + Sync + 'static,
    S: Send + 'static,
    T: fmt::Debug + Send + 'static,
    Sup: FnMut() -> R,
    G: Fn(&Arc<Companion<R>>) -> Sequence<S> + Send + Sync + 'static,
    Op: Fn(Sequence<S>, &Arc<Companion<R>>) -> Sequence<T> + Send + Sync + 'static,
    E: Fn(ScheduledContextCase<T, R>) -> TestOutcome + 'static,
{
    let cases = plan_variants(
        registry,
        operator_name,
        resource_supplier,
        source_generator,
        operator_under_test,
    );
    DynamicTest::stream(cases, executor)
}

/// Resource-less form of [`generate_scheduled_with_context_tests`].
pub fn generate_simple_scheduled_with_context_tests<S, T, B, Op, E>(
    registry: &Arc<HookRegistry>,
    operator_name: &str,
    source_builder: B,
    operator_under_test: Op,
    executor: E,
) -> impl Iterator<Item = DynamicTest>
where
    S: Send + 'static,
    T: fmt::Debug + Send + 'static,
    B: Fn() -> Sequence<S> + Send + Sync + 'static,
    Op: Fn(Sequence<S>) -> Sequence<T> + Send + Sync + 'static,
    E: Fn(ScheduledContextCase<T, ()>) -> TestOutcome + 'static,
{
    generate_scheduled_with_context_tests(
        registry,
        operator_name,
        || (),
        move |_: &Arc<Companion<()>>| source_builder(),
        move |source: Sequence<S>, _: &Arc<Companion<()>>| operator_under_test(source),
        executor,
    )
}
