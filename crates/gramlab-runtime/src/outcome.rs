/// The result of running one of the engines to completion.
///
/// `trace` holds the rules in the order the engine applied them: the
/// leftmost derivation for the predictive engine, the reduction sequence
/// for the shift/reduce engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<TRule, TFailure> {
    trace: Vec<TRule>,
    failure: Option<TFailure>,
}

impl<TRule, TFailure> ParseOutcome<TRule, TFailure> {
    pub(crate) fn accepted(trace: Vec<TRule>) -> Self {
        Self {
            trace,
            failure: None,
        }
    }

    pub(crate) fn rejected(trace: Vec<TRule>, failure: TFailure) -> Self {
        Self {
            trace,
            failure: Some(failure),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.failure.is_none()
    }

    pub fn trace(&self) -> &[TRule] {
        &self.trace[..]
    }

    /// Return where the input was rejected, if it was.
    pub fn failure(&self) -> Option<&TFailure> {
        self.failure.as_ref()
    }

    pub fn into_trace(self) -> Vec<TRule> {
        self.trace
    }
}
