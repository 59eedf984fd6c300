// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick.
    Idle,
    /// Stats query in flight.
    Sampling,
    /// Appending a sample to the record.
    Persisting,
    /// Final flush done, loop returned.
    Stopped,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        self == LoopState::Stopped
    }

    pub(crate) fn can_transition_to(self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (Idle, Sampling)
                | (Idle, Stopped)
                | (Sampling, Persisting)
                | (Sampling, Idle)
                | (Sampling, Stopped)
                | (Persisting, Idle)
                | (Persisting, Stopped)
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Sampling => write!(f, "sampling"),
            LoopState::Persisting => write!(f, "persisting"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}
