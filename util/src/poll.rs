//! Bounded-retry polling policy
//!
//! Hardware reads are noisy and occasionally fail outright. Rather than
//! scattering retry loops through the estimation code, modules wrap their
//! sensor accesses in a [`Poller`] which owns the retry bound.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A retry policy for polled operations.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    max_attempts: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error from a polled operation whose retries have been exhausted.
#[derive(Debug, Error)]
pub enum PollError<E: std::error::Error + 'static> {
    #[error("Operation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,

        #[source]
        last: E,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Poller {
    /// Create a new poller which will attempt an operation at most
    /// `max_attempts` times (minimum 1).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run the given operation until it succeeds or the attempt bound is
    /// reached, returning the last error in that case.
    pub fn poll_with_retry<T, E, F>(&self, mut op: F) -> Result<T, PollError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Result<T, E>,
    {
        let mut last = match op() {
            Ok(t) => return Ok(t),
            Err(e) => e,
        };

        for _ in 1..self.max_attempts {
            match op() {
                Ok(t) => return Ok(t),
                Err(e) => last = e,
            }
        }

        Err(PollError::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
