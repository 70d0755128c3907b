//! Diary seam.
//!
//! The engine does not write diary content. It only tells the diary
//! subsystem that a committed `update_debug_diary` happened, so the
//! subsystem can correlate its entries with the session.

use crate::session::SessionState;

pub trait DiaryObserver: std::fmt::Debug + Send + Sync {
    /// Called after an `update_debug_diary` was allowed and succeeded.
    /// `session` reflects the state after the phase gate recorded the work.
    fn diary_updated(&self, session: &SessionState);
}

/// Observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDiary;

impl DiaryObserver for NullDiary {
    fn diary_updated(&self, _session: &SessionState) {}
}
