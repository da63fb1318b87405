/// One line of user-facing progress. `level` is the minimum verbosity at
/// which the line is shown; 0 is always visible.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub level: u8,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(level: u8, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Line-oriented reporter gated by the `-v` counter.
pub struct LineOutput {
    verbosity: u8,
}

impl LineOutput {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }
}

impl ProgressSink for LineOutput {
    fn event(&self, event: ProgressEvent) {
        if event.level <= self.verbosity {
            println!("{}", event.message);
        }
    }
}

/// Sink that drops everything; used where progress was not requested.
pub struct SilentOutput;

impl ProgressSink for SilentOutput {
    fn event(&self, _event: ProgressEvent) {}
}
