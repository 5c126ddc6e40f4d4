//! Debug-log suppression around parallel sections.
//!
//! The `log` max level is process-global. While workers run it is capped at
//! `Info` so per-piece debug and trace lines from many threads do not
//! interleave, and restored when the guard drops.
//!
//! Guards from overlapping calls share one suppression: the first guard to
//! engage records the level to restore and only the last one to drop puts
//! it back. Changing the max level yourself while a call is in flight is
//! not tracked; the restored level is the one seen by the first guard.

use log::LevelFilter;
use parking_lot::{const_mutex, Mutex};

struct QuietState {
    depth: usize,
    restore: Option<LevelFilter>,
}

static STATE: Mutex<QuietState> = const_mutex(QuietState {
    depth: 0,
    restore: None,
});

/// Restores the previous max log level once the last overlapping guard drops.
pub struct QuietDebug {
    engaged: bool,
}

impl QuietDebug {
    /// Cap the max level at `Info` when `enabled`.
    pub fn engage(enabled: bool) -> Self {
        if !enabled {
            return Self { engaged: false };
        }
        let mut state = STATE.lock();
        if state.depth == 0 {
            let current = log::max_level();
            state.restore = quieted(current).map(|level| {
                log::set_max_level(level);
                current
            });
        }
        state.depth += 1;
        Self { engaged: true }
    }

    /// Whether this guard takes part in suppression.
    pub fn is_active(&self) -> bool {
        self.engaged
    }
}

impl Drop for QuietDebug {
    fn drop(&mut self) {
        if !self.engaged {
            return;
        }
        let mut state = STATE.lock();
        state.depth -= 1;
        if state.depth == 0 {
            if let Some(level) = state.restore.take() {
                log::set_max_level(level);
            }
        }
    }
}

/// The level to switch to, or `None` when `current` is already quiet.
fn quieted(current: LevelFilter) -> Option<LevelFilter> {
    (current > LevelFilter::Info).then_some(LevelFilter::Info)
}
