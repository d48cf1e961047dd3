//! Single-shot outcome of one pipeline run.

use crate::error::{LambdaError, Result};

enum State<T> {
    Running,
    Settled(Result<T>),
}

/// Settles at most once: the first success or failure sticks and every later
/// attempt is refused.
pub struct Completion<T> {
    state: State<T>,
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self { state: State::Running }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running)
    }

    /// Returns whether this call settled the outcome.
    pub fn succeed(&mut self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Returns whether this call settled the outcome.
    pub fn fail(&mut self, error: LambdaError) -> bool {
        self.settle(Err(error))
    }

    fn settle(&mut self, outcome: Result<T>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = State::Settled(outcome);
        true
    }

    /// The settled outcome, or `None` while still running.
    pub fn into_outcome(self) -> Option<Result<T>> {
        match self.state {
            State::Running => None,
            State::Settled(outcome) => Some(outcome),
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageKind;
    use std::io;

    fn stage_error(stage: StageKind) -> LambdaError {
        LambdaError::stage(stage, io::Error::other("boom"))
    }

    #[test]
    fn first_failure_wins_over_later_success() {
        let mut completion = Completion::new();
        assert!(completion.fail(stage_error(StageKind::FileReader)));
        assert!(!completion.succeed("done"));

        let err = completion.into_outcome().unwrap().unwrap_err();
        assert_eq!(err.failed_stage(), Some(StageKind::FileReader));
    }

    #[test]
    fn later_failures_are_ignored() {
        let mut completion: Completion<()> = Completion::new();
        assert!(completion.fail(stage_error(StageKind::GzipEncoder)));
        assert!(!completion.fail(stage_error(StageKind::FileWriter)));

        let err = completion.into_outcome().unwrap().unwrap_err();
        assert_eq!(err.failed_stage(), Some(StageKind::GzipEncoder));
    }

    #[test]
    fn success_is_not_overwritten() {
        let mut completion = Completion::new();
        assert!(completion.succeed(7));
        assert!(!completion.fail(stage_error(StageKind::FileWriter)));
        assert_eq!(completion.into_outcome().unwrap().unwrap(), 7);
    }

    #[test]
    fn unsettled_has_no_outcome() {
        let completion: Completion<()> = Completion::new();
        assert!(completion.is_running());
        assert!(completion.into_outcome().is_none());
    }
}
