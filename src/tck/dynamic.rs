//! Minimal dynamic-test surface for generated families.
//!
//! A generated family is exposed as a finite iterator of [`DynamicTest`]s,
//! each a name plus a deferred executable. [`run_all`] drives them one after
//! another and records a [`TestReport`]; a panic inside an executable is
//! caught and recorded as a failure of that test only.

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Result of one executable.
pub type TestOutcome = Result<(), Box<dyn StdError + Send + Sync>>;

/// Anything carrying a display name for the test framework.
pub trait Named {
    /// Name used to label the generated test.
    fn name(&self) -> &str;
}

/// A named, deferred test body.
pub struct DynamicTest {
    name: String,
    executable: Box<dyn FnOnce() -> TestOutcome>,
}

impl DynamicTest {
    /// Creates a test from a name and a body.
    pub fn new<F>(name: impl Into<String>, executable: F) -> Self
    where
        F: FnOnce() -> TestOutcome + 'static,
    {
        Self {
            name: name.into(),
            executable: Box::new(executable),
        }
    }

    /// Lazily pairs each named payload with `executor`.
    pub fn stream<P, I, E>(payloads: I, executor: E) -> impl Iterator<Item = Self>
    where
        P: Named + 'static,
        I: IntoIterator<Item = P>,
        E: Fn(P) -> TestOutcome + 'static,
    {
        let executor = Arc::new(executor);
        payloads.into_iter().map(move |payload| {
            let executor = Arc::clone(&executor);
            let name = payload.name().to_string();
            Self::new(name, move || executor(payload))
        })
    }

    /// Name of this test.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the body, converting a panic into a failure.
    pub fn execute(self) -> TestOutcome {
        match catch_unwind(AssertUnwindSafe(self.executable)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(panic_message(payload.as_ref()).into()),
        }
    }
}

impl fmt::Debug for DynamicTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTest")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// Status of one executed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The body returned `Ok`.
    Passed,
    /// The body returned `Err` or panicked.
    Failed,
}

/// Record of one executed test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    /// Test name.
    pub name: String,
    /// Outcome.
    pub status: TestStatus,
    /// Failure message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall time spent in the body.
    pub duration_ms: u64,
}

/// Outcome of a [`run_all`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestReport {
    /// Records in execution order.
    pub records: Vec<TestRecord>,
}

impl TestReport {
    /// Names of every executed test, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Number of passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Number of failed tests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// True when at least one test ran and none failed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.records.is_empty() && self.failed() == 0
    }

    /// Looks up a record by name.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&TestRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Serializes the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Executes `tests` in order and records the outcomes.
pub fn run_all(tests: impl IntoIterator<Item = DynamicTest>) -> TestReport {
    let mut report = TestReport::default();
    for test in tests {
        let name = test.name.clone();
        let start = Instant::now();
        let outcome = test.execute();
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = match outcome {
            Ok(()) => {
                tracing::debug!(test = %name, duration_ms, "dynamic test passed");
                TestRecord {
                    name,
                    status: TestStatus::Passed,
                    message: None,
                    duration_ms,
                }
            }
            Err(error) => {
                tracing::warn!(test = %name, %error, "dynamic test failed");
                TestRecord {
                    name,
                    status: TestStatus::Failed,
                    message: Some(error.to_string()),
                    duration_ms,
                }
            }
        };
        report.records.push(record);
    }
    report
}
