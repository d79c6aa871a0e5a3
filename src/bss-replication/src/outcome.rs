/// The result of applying one change (§4.6, §9 "model these as result
/// variants... only escalate envelope failures to the transport layer").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Processed,
    Ignored { reason: String },
}

impl ApplyOutcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        ApplyOutcome::Ignored { reason: reason.into() }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, ApplyOutcome::Processed)
    }
}
