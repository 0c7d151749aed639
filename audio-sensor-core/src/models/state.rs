/// Audio sensor lifecycle.
///
/// State transitions:
/// ```text
/// uninitialized → opened → running ⇄ stopped
///                    ↓        ↓         ↓
///                  closed ← ─ ┴ ─ ─ ─ ─ ┘
/// ```
///
/// Reconfiguration requires building a new sensor; there is no path back to
/// `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorState {
    Uninitialized,
    Opened,
    Running,
    Stopped,
    Closed,
}

impl SensorState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Opened | Self::Running | Self::Stopped)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Opened => "opened",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Closed => "closed",
        }
    }
}
