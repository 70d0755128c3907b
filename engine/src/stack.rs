//! Session stack: invocation frames plus the sessions they reference.
//!
//! Frames reference sessions by id. The stack owns both the frames and the
//! live sessions; a session leaves the live set only when the frame that
//! created it is popped, at which point it becomes a retired tombstone.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::Denial;
use crate::session::{SessionId, SessionState};

/// Default number of retired sessions remembered for `SessionClosed` lookups.
pub const DEFAULT_RETIRED_CAPACITY: usize = 64;

/// Per-stack frame identifier. Starts at 1 and only increases.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One flight-config invocation, nested or not.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InvocationFrame {
    pub id: FrameId,
    /// Session this frame is bound to (not owned)
    pub session: SessionId,
    /// Whether this frame created the session and retires it on exit
    pub created_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_config: Option<String>,
}

#[derive(Debug)]
pub struct SessionStack {
    frames: Vec<InvocationFrame>,
    live: HashMap<SessionId, SessionState>,
    retired: VecDeque<SessionState>,
    retired_capacity: usize,
    next_frame: u64,
}

impl SessionStack {
    /// `retired_capacity` is at least 1, so the most recently retired
    /// session is always remembered.
    pub fn new(retired_capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            live: HashMap::new(),
            retired: VecDeque::new(),
            retired_capacity: retired_capacity.max(1),
            next_frame: 1,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[InvocationFrame] {
        &self.frames
    }

    pub fn top(&self) -> Option<&InvocationFrame> {
        self.frames.last()
    }

    /// The session gates evaluate against: the top frame's session.
    pub fn current(&self) -> Option<&SessionState> {
        self.top().and_then(|frame| self.live.get(&frame.session))
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut SessionState> {
        let id = self.top()?.session;
        self.live.get_mut(&id)
    }

    /// Look up a live or retired session.
    pub fn session(&self, id: &SessionId) -> Option<&SessionState> {
        self.live
            .get(id)
            .or_else(|| self.retired.iter().find(|s| s.id() == *id))
    }

    /// Whether `frame` is the current top, as an exit would require.
    pub fn check_top(&self, frame: FrameId) -> Result<(), Denial> {
        let top = self.top().map(|f| f.id);
        if top == Some(frame) {
            Ok(())
        } else {
            Err(Denial::StackMismatch {
                expected: top,
                got: frame,
            })
        }
    }

    pub(crate) fn insert_session(&mut self, session: SessionState) -> SessionId {
        let id = session.id();
        self.live.insert(id, session);
        id
    }

    pub(crate) fn push(
        &mut self,
        session: SessionId,
        created_session: bool,
        flight_config: Option<String>,
    ) -> InvocationFrame {
        let frame = InvocationFrame {
            id: FrameId::new(self.next_frame),
            session,
            created_session,
            flight_config,
        };
        self.next_frame += 1;
        self.frames.push(frame.clone());
        frame
    }

    /// Pop `frame`, which must be the top. On mismatch the stack is untouched.
    pub(crate) fn pop(&mut self, frame: FrameId) -> Result<InvocationFrame, Denial> {
        self.check_top(frame)?;
        self.frames.pop().ok_or(Denial::StackMismatch {
            expected: None,
            got: frame,
        })
    }

    /// Move a live session to the retired tombstones.
    pub(crate) fn retire(&mut self, id: &SessionId) -> Option<SessionId> {
        let mut session = self.live.remove(id)?;
        session.retire();
        self.retired.push_back(session);
        while self.retired.len() > self.retired_capacity {
            self.retired.pop_front();
        }
        Some(*id)
    }
}

impl Default for SessionStack {
    fn default() -> Self {
        Self::new(DEFAULT_RETIRED_CAPACITY)
    }
}
