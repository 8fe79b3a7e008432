//! Step-by-step verification of a [`Sequence`].
//!
//! [`StepVerifier::create`] returns a [`FirstStep`] on which expectations are
//! declared in order. A terminal expectation turns it into a [`Verifier`], and
//! nothing is subscribed until [`Verifier::verify`] runs. Signals are received
//! over a channel from whatever thread delivers them; each expectation waits
//! at most for what remains of the configured timeout.
//!
//! ```ignore
//! StepVerifier::create(Sequence::from_iter(vec![1, 2]), VerifierOptions::create())
//!     .expect_next(1)
//!     .expect_next(2)
//!     .expect_complete()
//!     .verify()?;
//! ```

mod options;

pub use options::VerifierOptions;

use crate::context::ContextMap;
use crate::error::Error;
use crate::flow::{Sequence, Subscriber};
use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Failure reported by [`Verifier::verify`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// No signal arrived before the deadline.
    #[error("[{scenario}] timed out after {waited:?} waiting for {expected}")]
    Timeout {
        /// Scenario label.
        scenario: String,
        /// What the verifier was waiting for.
        expected: String,
        /// Configured timeout.
        waited: Duration,
    },
    /// A signal of the wrong kind arrived.
    #[error("[{scenario}] expected {expected}, got {actual}")]
    UnexpectedSignal {
        /// Scenario label.
        scenario: String,
        /// Expected signal.
        expected: String,
        /// Received signal.
        actual: String,
    },
    /// An item differed from the expected value.
    #[error("[{scenario}] expected onNext({expected}), got onNext({actual})")]
    Mismatch {
        /// Scenario label.
        scenario: String,
        /// Expected value.
        expected: String,
        /// Received value.
        actual: String,
    },
    /// An item or error failed a predicate.
    #[error("[{scenario}] {actual} did not satisfy {description}")]
    Predicate {
        /// Scenario label.
        scenario: String,
        /// Predicate description.
        description: String,
        /// Received signal.
        actual: String,
    },
    /// The subscription went away without a terminal signal.
    #[error("[{scenario}] subscription dropped while waiting for {expected}")]
    Dropped {
        /// Scenario label.
        scenario: String,
        /// What the verifier was waiting for.
        expected: String,
    },
}

enum Signal<T> {
    Next(T),
    Error(Error),
    Complete,
}

impl<T: fmt::Debug> Signal<T> {
    fn describe(&self) -> String {
        match self {
            Self::Next(item) => format!("onNext({item:?})"),
            Self::Error(error) => format!("onError({error})"),
            Self::Complete => "onComplete()".to_string(),
        }
    }
}

struct ChannelSubscriber<T> {
    ctx: ContextMap,
    tx: Sender<Signal<T>>,
}

impl<T: Send + 'static> Subscriber<T> for ChannelSubscriber<T> {
    fn context(&self) -> &ContextMap {
        &self.ctx
    }

    fn on_next(&mut self, item: T) {
        let _ = self.tx.send(Signal::Next(item));
    }

    fn on_error(&mut self, error: Error) {
        let _ = self.tx.send(Signal::Error(error));
    }

    fn on_complete(&mut self) {
        let _ = self.tx.send(Signal::Complete);
    }
}

enum Expectation<T> {
    NextEquals {
        expected: String,
        check: Box<dyn FnMut(&T) -> bool>,
    },
    NextMatches {
        description: String,
        predicate: Box<dyn FnMut(&T) -> bool>,
    },
    NextCount(usize),
    Consume(Box<dyn FnMut(T)>),
    ConsumeWhile(Box<dyn FnMut(&T) -> bool>),
}

enum Terminal {
    Complete,
    Error {
        description: String,
        predicate: Box<dyn FnOnce(&Error) -> bool>,
    },
}

/// Entry point of the assertion engine.
#[derive(Debug, Clone, Copy)]
pub struct StepVerifier;

impl StepVerifier {
    /// Prepares verification of `sequence` under `options`.
    pub fn create<T>(sequence: Sequence<T>, options: VerifierOptions) -> FirstStep<T>
    where
        T: fmt::Debug + Send + 'static,
    {
        FirstStep {
            sequence,
            options,
            expectations: Vec::new(),
        }
    }
}

/// Expectation chain under construction.
#[must_use = "expectations do nothing until verified"]
pub struct FirstStep<T> {
    sequence: Sequence<T>,
    options: VerifierOptions,
    expectations: Vec<Expectation<T>>,
}

impl<T: fmt::Debug + Send + 'static> FirstStep<T> {
    /// Options this chain will run with.
    #[must_use]
    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Expects the next item to equal `value`.
    pub fn expect_next(mut self, value: T) -> Self
    where
        T: PartialEq,
    {
        self.expectations.push(Expectation::NextEquals {
            expected: format!("{value:?}"),
            check: Box::new(move |actual: &T| *actual == value),
        });
        self
    }

    /// Expects each of `values`, in order.
    pub fn expect_next_sequence(mut self, values: impl IntoIterator<Item = T>) -> Self
    where
        T: PartialEq,
    {
        for value in values {
            self = self.expect_next(value);
        }
        self
    }

    /// Expects the next item to satisfy `predicate`.
    pub fn expect_next_matches<P>(mut self, description: impl Into<String>, predicate: P) -> Self
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.expectations.push(Expectation::NextMatches {
            description: description.into(),
            predicate: Box::new(predicate),
        });
        self
    }

    /// Expects exactly `count` items, whatever their values.
    pub fn expect_next_count(mut self, count: usize) -> Self {
        self.expectations.push(Expectation::NextCount(count));
        self
    }

    /// Expects an item and hands it to `consumer`; panics in `consumer` fail the test.
    pub fn consume_next_with<F>(mut self, consumer: F) -> Self
    where
        F: FnMut(T) + 'static,
    {
        self.expectations.push(Expectation::Consume(Box::new(consumer)));
        self
    }

    /// Consumes items for as long as `predicate` holds.
    pub fn then_consume_while<P>(mut self, predicate: P) -> Self
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.expectations
            .push(Expectation::ConsumeWhile(Box::new(predicate)));
        self
    }

    /// Expects normal completion.
    pub fn expect_complete(self) -> Verifier<T> {
        self.finish(Terminal::Complete)
    }

    /// Expects an error of any kind.
    pub fn expect_error(self) -> Verifier<T> {
        self.finish(Terminal::Error {
            description: "any error".to_string(),
            predicate: Box::new(|_: &Error| true),
        })
    }

    /// Expects an error satisfying `predicate`.
    pub fn expect_error_matches<P>(self, description: impl Into<String>, predicate: P) -> Verifier<T>
    where
        P: FnOnce(&Error) -> bool + 'static,
    {
        self.finish(Terminal::Error {
            description: description.into(),
            predicate: Box::new(predicate),
        })
    }

    /// Shorthand for `expect_complete().verify()`.
    pub fn verify_complete(self) -> Result<Duration, VerificationError> {
        self.expect_complete().verify()
    }

    fn finish(self, terminal: Terminal) -> Verifier<T> {
        Verifier {
            sequence: self.sequence,
            options: self.options,
            expectations: self.expectations,
            terminal,
        }
    }
}

/// Fully declared expectation chain, ready to run.
#[must_use = "expectations do nothing until verified"]
pub struct Verifier<T> {
    sequence: Sequence<T>,
    options: VerifierOptions,
    expectations: Vec<Expectation<T>>,
    terminal: Terminal,
}

impl<T: fmt::Debug + Send + 'static> Verifier<T> {
    /// Subscribes and checks every expectation in order.
    ///
    /// Returns the elapsed time on success.
    pub fn verify(self) -> Result<Duration, VerificationError> {
        let Self {
            sequence,
            options,
            expectations,
            terminal,
        } = self;
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        sequence.subscribe(ChannelSubscriber {
            ctx: options.initial_context.clone(),
            tx,
        });

        let mut reader = SignalReader {
            rx,
            pushed_back: VecDeque::new(),
            deadline: start + options.timeout,
            scenario: options.label().to_string(),
            timeout: options.timeout,
        };
        let outcome = run_expectations(&mut reader, expectations, terminal);
        let elapsed = start.elapsed();
        match &outcome {
            Ok(()) => tracing::debug!(
                scenario = %options.label(),
                elapsed_ms = elapsed.as_millis(),
                "verification passed"
            ),
            Err(error) => tracing::warn!(
                scenario = %options.label(),
                %error,
                "verification failed"
            ),
        }
        outcome.map(|()| elapsed)
    }
}

struct SignalReader<T> {
    rx: Receiver<Signal<T>>,
    pushed_back: VecDeque<Signal<T>>,
    deadline: Instant,
    scenario: String,
    timeout: Duration,
}

impl<T: fmt::Debug> SignalReader<T> {
    fn next(&mut self, expected: &str) -> Result<Signal<T>, VerificationError> {
        if let Some(signal) = self.pushed_back.pop_front() {
            return Ok(signal);
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(signal) => Ok(signal),
            Err(RecvTimeoutError::Timeout) => Err(VerificationError::Timeout {
                scenario: self.scenario.clone(),
                expected: expected.to_string(),
                waited: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(VerificationError::Dropped {
                scenario: self.scenario.clone(),
                expected: expected.to_string(),
            }),
        }
    }

    fn push_back(&mut self, signal: Signal<T>) {
        self.pushed_back.push_front(signal);
    }

    fn next_item(&mut self, expected: &str) -> Result<T, VerificationError> {
        match self.next(expected)? {
            Signal::Next(item) => Ok(item),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    fn unexpected(&self, expected: &str, actual: &Signal<T>) -> VerificationError {
        VerificationError::UnexpectedSignal {
            scenario: self.scenario.clone(),
            expected: expected.to_string(),
            actual: actual.describe(),
        }
    }
}

fn run_expectations<T: fmt::Debug>(
    reader: &mut SignalReader<T>,
    expectations: Vec<Expectation<T>>,
    terminal: Terminal,
) -> Result<(), VerificationError> {
    for expectation in expectations {
        match expectation {
            Expectation::NextEquals {
                expected,
                mut check,
            } => {
                let item = reader.next_item(&format!("onNext({expected})"))?;
                if !check(&item) {
                    return Err(VerificationError::Mismatch {
                        scenario: reader.scenario.clone(),
                        expected,
                        actual: format!("{item:?}"),
                    });
                }
            }
            Expectation::NextMatches {
                description,
                mut predicate,
            } => {
                let item = reader.next_item(&format!("onNext matching {description}"))?;
                if !predicate(&item) {
                    return Err(VerificationError::Predicate {
                        scenario: reader.scenario.clone(),
                        description,
                        actual: format!("onNext({item:?})"),
                    });
                }
            }
            Expectation::NextCount(count) => {
                for index in 0..count {
                    reader.next_item(&format!("onNext #{} of {count}", index + 1))?;
                }
            }
            Expectation::Consume(mut consumer) => {
                let item = reader.next_item("onNext to consume")?;
                consumer(item);
            }
            Expectation::ConsumeWhile(mut predicate) => loop {
                let signal = reader.next("onNext or terminal signal")?;
                let keep = match &signal {
                    Signal::Next(item) => predicate(item),
                    _ => false,
                };
                if !keep {
                    reader.push_back(signal);
                    break;
                }
            },
        }
    }

    match terminal {
        Terminal::Complete => match reader.next("onComplete()")? {
            Signal::Complete => Ok(()),
            other => Err(reader.unexpected("onComplete()", &other)),
        },
        Terminal::Error {
            description,
            predicate,
        } => {
            let expected = format!("onError matching {description}");
            match reader.next(&expected)? {
                Signal::Error(error) => {
                    if predicate(&error) {
                        Ok(())
                    } else {
                        Err(VerificationError::Predicate {
                            scenario: reader.scenario.clone(),
                            description,
                            actual: format!("onError({error})"),
                        })
                    }
                }
                other => Err(reader.unexpected(&expected, &other)),
            }
        }
    }
}
