use serde::{Deserialize, Serialize};

/// Target exposure from `timestamp_ms` onwards: 1.0 fully long, 0.0 flat, -1.0 fully short.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp_ms: i64,
    pub position: f64,
}

impl Signal {
    pub fn new(timestamp_ms: i64, position: f64) -> Self {
        Self {
            timestamp_ms,
            position,
        }
    }

    /// Exposure the backtester will actually hold. NaN counts as flat.
    pub fn clamped_position(&self) -> f64 {
        if self.position.is_nan() {
            return 0.0;
        }
        self.position.clamp(-1.0, 1.0)
    }
}
