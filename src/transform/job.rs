// Client-side discipline for the transformer: one job in flight at a time
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Gate guaranteeing single-flight transform submissions.
///
/// `try_begin` refuses to hand out a ticket while one is outstanding. The
/// ticket restores the gate on every exit path: dropping it without an
/// explicit verdict counts as a failure, so an early return or a panic can
/// never leave the gate stuck in `Running`.
pub struct JobGate {
    state: Mutex<JobState>,
}

impl JobGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(JobState::Idle),
        }
    }

    pub fn state(&self) -> JobState {
        *self.state.lock()
    }

    pub fn try_begin(&self) -> Option<JobTicket<'_>> {
        let mut state = self.state.lock();
        if *state == JobState::Running {
            return None;
        }
        *state = JobState::Running;
        Some(JobTicket {
            gate: self,
            resolved: false,
        })
    }
}

impl Default for JobGate {
    fn default() -> Self {
        Self::new()
    }
}

pub struct JobTicket<'a> {
    gate: &'a JobGate,
    resolved: bool,
}

impl JobTicket<'_> {
    pub fn succeed(mut self) {
        self.resolve(JobState::Succeeded);
    }

    pub fn fail(mut self) {
        self.resolve(JobState::Failed);
    }

    fn resolve(&mut self, verdict: JobState) {
        *self.gate.state.lock() = verdict;
        self.resolved = true;
    }
}

impl Drop for JobTicket<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.resolve(JobState::Failed);
        }
    }
}
