use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Opens the current site and polls its window until closed.
    SiteWatch,
}

#[derive(Debug, Clone)]
pub struct TaskStarted {
    pub id: TaskId,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug)]
pub struct TaskCompleted<E> {
    pub id: TaskId,
    pub result: E,
}

/// Task lifecycle state (stored in AppState, mutated only by reducer).
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    pub active: Option<TaskId>,
    pub cancel: Option<CancellationToken>,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Registers a task the reducer is about to spawn and returns its cancel token.
    ///
    /// The token exists before the runtime reports `TaskStarted`, so the task
    /// can be cancelled even if that report has not been drained yet.
    pub fn begin(&mut self, id: TaskId) -> CancellationToken {
        let token = CancellationToken::new();
        self.active = Some(id);
        self.cancel = Some(token.clone());
        token
    }

    /// Acknowledges the runtime's start report. Reports for tasks that were
    /// already cancelled or replaced are ignored.
    pub fn on_started(&mut self, started: &TaskStarted) -> bool {
        if self.active != Some(started.id) {
            return false;
        }
        if started.cancel.is_some() {
            self.cancel.clone_from(&started.cancel);
        }
        true
    }

    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.active == Some(id);
        if ok {
            self.clear();
        }
        ok
    }

    /// Forgets the active task, returning its cancel token.
    pub fn take_cancel(&mut self) -> Option<CancellationToken> {
        self.active = None;
        self.cancel.take()
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.cancel = None;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tasks {
    pub site_watch: TaskState,
}

impl Tasks {
    pub fn state_mut(&mut self, kind: TaskKind) -> &mut TaskState {
        match kind {
            TaskKind::SiteWatch => &mut self.site_watch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut seq = TaskSeq::default();
        let first = seq.next_id();
        let second = seq.next_id();
        assert_ne!(first, second);

        let mut state = TaskState::default();
        state.begin(second);

        assert!(!state.finish_if_active(first));
        assert!(state.is_running());
        assert!(state.finish_if_active(second));
        assert!(!state.is_running());
    }

    #[test]
    fn test_take_cancel_clears_active_task() {
        let mut state = TaskState::default();
        let token = state.begin(TaskId(3));

        let taken = state.take_cancel().unwrap();
        taken.cancel();
        assert!(token.is_cancelled());
        assert!(!state.is_running());
        assert!(!state.finish_if_active(TaskId(3)));
    }

    #[test]
    fn test_late_start_report_does_not_revive_cancelled_task() {
        let mut state = TaskState::default();
        let token = state.begin(TaskId(1));
        assert!(state.take_cancel().is_some());

        let revived = state.on_started(&TaskStarted {
            id: TaskId(1),
            cancel: Some(token),
        });
        assert!(!revived);
        assert!(!state.is_running());
        assert!(state.take_cancel().is_none());
    }

    #[test]
    fn test_start_report_for_current_task_is_acknowledged() {
        let mut state = TaskState::default();
        let token = state.begin(TaskId(4));
        assert!(state.on_started(&TaskStarted {
            id: TaskId(4),
            cancel: Some(token.clone()),
        }));
        assert!(state.is_running());
        assert!(!state.on_started(&TaskStarted {
            id: TaskId(2),
            cancel: None,
        }));
    }
}
