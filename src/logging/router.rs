use super::Severity;

/// Static partition of severities used to route records to sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// `DEBUG <= level < ERROR`
    Low,
    /// `level >= ERROR`
    High,
}

impl Priority {
    pub fn accepts(self, severity: Severity) -> bool {
        match self {
            Priority::Low => severity >= Severity::DEBUG && severity < Severity::ERROR,
            Priority::High => severity >= Severity::ERROR,
        }
    }

    /// The partition a severity falls into, `None` for custom levels below `DEBUG`.
    pub fn classify(severity: Severity) -> Option<Priority> {
        [Priority::Low, Priority::High]
            .into_iter()
            .find(|priority| priority.accepts(severity))
    }
}
