#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tabula_core::Float;
use tracing::info;

use crate::regressor::Status;

/// Snapshot taken right after `initialize`, before the first descent step.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialParams<'a> {
    pub alpha: Float,
    pub lambda: Float,
    pub label: &'a str,
    pub coefficient_count: usize,
    pub initial_cost: Float,
}

/// Outcome of a finished `fit`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    pub iterations: usize,
    pub final_cost: Float,
    pub status: Status,
}

/// Receives training diagnostics. Both hooks default to doing nothing.
pub trait Reporter {
    fn initialized(&self, _params: &InitialParams<'_>) {}

    fn finished(&self, _summary: &FitSummary) {}
}

/// Writes diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn initialized(&self, params: &InitialParams<'_>) {
        info!(
            alpha = params.alpha,
            lambda = params.lambda,
            label = params.label,
            coefficients = params.coefficient_count,
            initial_cost = params.initial_cost,
            "starting gradient descent"
        );
    }

    fn finished(&self, summary: &FitSummary) {
        info!(
            iterations = summary.iterations,
            final_cost = summary.final_cost,
            status = ?summary.status,
            "gradient descent finished"
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}
