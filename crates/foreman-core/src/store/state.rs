//! Task list + scan cursor, guarded by the store's single lock.
//!
//! Everything here is synchronous and lock-free by itself: `TaskStore` holds
//! `StoreState` behind one `tokio::sync::Mutex`, so every method below runs
//! with exclusive access to both the list size and per-task state.

use chrono::{DateTime, Utc};

use crate::domain::{Completion, ContentRef, Task, TaskCounts, TaskId, TaskState};

/// In-memory store state.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    /// All task records. `tasks[i].id() == i`.
    tasks: Vec<Task>,

    /// Smallest index not yet known Done. Only ever moves forward.
    cursor: usize,
}

impl StoreState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Append a Pending task. Its id is its position.
    pub(crate) fn create(&mut self, input_ref: ContentRef) -> TaskId {
        let id = TaskId::from_index(self.tasks.len());
        self.tasks.push(Task::new(id, input_ref));
        id
    }

    /// Scan `[cursor, len)` for the first Pending task and lease it.
    ///
    /// The cursor only skips over a Done task sitting exactly at the cursor, so it
    /// can lag behind Done tasks further down the list. Leased tasks in the middle
    /// of the range are skipped and looked at again on every call.
    pub(crate) fn lease_next(&mut self, now: DateTime<Utc>) -> Option<Task> {
        let mut i = self.cursor;
        while i < self.tasks.len() {
            let state = self.tasks[i].state();
            if state == TaskState::Done && i == self.cursor {
                self.cursor += 1;
            } else if state.is_leasable() {
                self.tasks[i].start_lease(now);
                return Some(self.tasks[i].clone());
            }
            i += 1;
        }
        None
    }

    /// Record completion of `id`.
    pub(crate) fn mark_done(
        &mut self,
        id: TaskId,
        output_ref: Option<ContentRef>,
        now: DateTime<Utc>,
    ) -> Completion {
        let Some(task) = self.task_mut(id) else {
            return Completion::NotFound;
        };

        match task.state() {
            TaskState::Leased => {
                task.complete(output_ref, now);
                Completion::Accepted
            }
            TaskState::Done => {
                task.complete(output_ref, now);
                Completion::AlreadyDone
            }
            TaskState::Pending => Completion::NotLeased,
        }
    }

    /// Lease expiry. Reverts `id` to Pending only if it is still Leased under
    /// `generation`; returns whether anything changed.
    pub(crate) fn reclaim(&mut self, id: TaskId, generation: u64) -> bool {
        match self.task_mut(id) {
            Some(task)
                if task.state() == TaskState::Leased && task.lease_generation() == generation =>
            {
                task.reclaim();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&Task> {
        id.index().and_then(|i| self.tasks.get(i))
    }

    pub(crate) fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub(crate) fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for task in &self.tasks {
            match task.state() {
                TaskState::Pending => counts.pending += 1,
                TaskState::Leased => counts.leased += 1,
                TaskState::Done => counts.done += 1,
            }
        }
        counts
    }

    fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        id.index().and_then(|i| self.tasks.get_mut(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn with_tasks(n: usize) -> StoreState {
        let mut state = StoreState::new();
        for i in 0..n {
            state.create(ContentRef::new(format!("in{i}")));
        }
        state
    }

    fn states(state: &StoreState) -> Vec<TaskState> {
        state.tasks().iter().map(Task::state).collect()
    }

    /// Index of the first task that is not Done (or len when all are).
    fn first_not_done(state: &StoreState) -> usize {
        state
            .tasks()
            .iter()
            .position(|t| t.state() != TaskState::Done)
            .unwrap_or(state.len())
    }

    #[test]
    fn create_assigns_dense_ids_in_order() {
        let mut state = StoreState::new();
        assert_eq!(state.create(ContentRef::new("a")), TaskId::new(0));
        assert_eq!(state.create(ContentRef::new("b")), TaskId::new(1));
        assert_eq!(state.create(ContentRef::new("c")), TaskId::new(2));

        for (i, task) in state.tasks().iter().enumerate() {
            assert_eq!(task.id(), TaskId::from_index(i));
            assert_eq!(task.state(), TaskState::Pending);
        }
    }

    #[test]
    fn lease_next_on_empty_store_is_none() {
        let mut state = StoreState::new();
        assert!(state.lease_next(now()).is_none());
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn lease_next_hands_out_tasks_in_order() {
        let mut state = with_tasks(3);
        let ids: Vec<_> = std::iter::from_fn(|| state.lease_next(now()))
            .map(|t| t.id())
            .collect();
        assert_eq!(ids, vec![TaskId::new(0), TaskId::new(1), TaskId::new(2)]);
        assert!(state.lease_next(now()).is_none());
    }

    #[test]
    fn leased_task_is_returned_with_its_generation() {
        let mut state = with_tasks(1);
        let task = state.lease_next(now()).unwrap();
        assert_eq!(task.state(), TaskState::Leased);
        assert_eq!(task.lease_generation(), 1);
        assert_eq!(task.input_ref(), &ContentRef::new("in0"));
        assert_eq!(task.leased_at(), Some(now()));
    }

    #[test]
    fn scenario_a_done_task_keeps_its_output() {
        let mut state = with_tasks(3);

        let first = state.lease_next(now()).unwrap();
        assert_eq!(first.id(), TaskId::new(0));

        let completion = state.mark_done(TaskId::new(0), Some(ContentRef::new("out0")), now());
        assert_eq!(completion, Completion::Accepted);

        let second = state.lease_next(now()).unwrap();
        assert_eq!(second.id(), TaskId::new(1));

        let task0 = state.get(TaskId::new(0)).unwrap();
        assert_eq!(task0.state(), TaskState::Done);
        assert_eq!(task0.output_ref(), Some(&ContentRef::new("out0")));
    }

    #[test]
    fn scenario_d_duplicate_completion_last_write_wins() {
        let mut state = with_tasks(1);
        state.lease_next(now()).unwrap();

        let first = state.mark_done(TaskId::new(0), Some(ContentRef::new("a")), now());
        let second = state.mark_done(TaskId::new(0), Some(ContentRef::new("b")), now());

        assert_eq!(first, Completion::Accepted);
        assert_eq!(second, Completion::AlreadyDone);
        let task = state.get(TaskId::new(0)).unwrap();
        assert_eq!(task.state(), TaskState::Done);
        assert_eq!(task.output_ref(), Some(&ContentRef::new("b")));
    }

    #[rstest]
    #[case::just_past_end(3)]
    #[case::far_past_end(1_000)]
    #[case::max(u64::MAX)]
    fn mark_done_out_of_range_leaves_store_unchanged(#[case] id: u64) {
        let mut state = with_tasks(3);
        state.lease_next(now()).unwrap();
        let before = state.tasks().to_vec();
        let cursor = state.cursor();

        let completion = state.mark_done(TaskId::new(id), Some(ContentRef::new("x")), now());

        assert_eq!(completion, Completion::NotFound);
        assert_eq!(state.tasks(), &before[..]);
        assert_eq!(state.cursor(), cursor);
    }

    #[test]
    fn mark_done_on_pending_task_is_rejected() {
        let mut state = with_tasks(1);
        let completion = state.mark_done(TaskId::new(0), Some(ContentRef::new("x")), now());
        assert_eq!(completion, Completion::NotLeased);
        assert_eq!(states(&state), vec![TaskState::Pending]);
    }

    #[test]
    fn completion_without_output_still_finishes_the_task() {
        let mut state = with_tasks(1);
        state.lease_next(now()).unwrap();
        assert_eq!(state.mark_done(TaskId::new(0), None, now()), Completion::Accepted);
        let task = state.get(TaskId::new(0)).unwrap();
        assert_eq!(task.state(), TaskState::Done);
        assert_eq!(task.output_ref(), None);
    }

    #[test]
    fn leased_task_in_the_middle_is_skipped() {
        let mut state = with_tasks(3);
        state.lease_next(now()).unwrap(); // 0
        state.lease_next(now()).unwrap(); // 1
        state.mark_done(TaskId::new(0), None, now());

        let next = state.lease_next(now()).unwrap();
        assert_eq!(next.id(), TaskId::new(2));
        assert_eq!(state.cursor(), 1);
        assert_eq!(
            states(&state),
            vec![TaskState::Done, TaskState::Leased, TaskState::Leased]
        );
    }

    #[test]
    fn cursor_skips_the_done_prefix() {
        let mut state = with_tasks(4);
        for _ in 0..2 {
            let t = state.lease_next(now()).unwrap();
            state.mark_done(t.id(), None, now());
        }
        // Cursor only advances during a scan: the second lease moved it past
        // task 0, but task 1 was finished afterwards.
        assert_eq!(state.cursor(), 1);

        let t = state.lease_next(now()).unwrap();
        assert_eq!(t.id(), TaskId::new(2));
        assert_eq!(state.cursor(), 2);
    }

    #[test]
    fn cursor_lags_behind_out_of_order_completion() {
        let mut state = with_tasks(3);
        let t0 = state.lease_next(now()).unwrap();
        let t1 = state.lease_next(now()).unwrap();
        state.mark_done(t1.id(), None, now());

        // Task 0 is still Leased, so the cursor cannot pass it.
        let t2 = state.lease_next(now()).unwrap();
        assert_eq!(t2.id(), TaskId::new(2));
        assert_eq!(state.cursor(), 0);

        state.mark_done(t0.id(), None, now());
        state.mark_done(t2.id(), None, now());
        assert!(state.lease_next(now()).is_none());
        assert_eq!(state.cursor(), 3);
    }

    #[test]
    fn reclaim_reverts_matching_generation_only() {
        let mut state = with_tasks(1);
        let t = state.lease_next(now()).unwrap();
        assert!(state.reclaim(t.id(), t.lease_generation()));
        assert_eq!(states(&state), vec![TaskState::Pending]);

        // Re-leased: the timer from the first lease must not touch it.
        let again = state.lease_next(now()).unwrap();
        assert_eq!(again.lease_generation(), 2);
        assert!(!state.reclaim(t.id(), t.lease_generation()));
        assert_eq!(states(&state), vec![TaskState::Leased]);
    }

    #[test]
    fn reclaim_of_done_task_is_noop() {
        let mut state = with_tasks(1);
        let t = state.lease_next(now()).unwrap();
        state.mark_done(t.id(), Some(ContentRef::new("out")), now());
        assert!(!state.reclaim(t.id(), t.lease_generation()));
        assert_eq!(states(&state), vec![TaskState::Done]);
    }

    #[test]
    fn reclaim_of_unknown_task_is_noop() {
        let mut state = with_tasks(1);
        assert!(!state.reclaim(TaskId::new(9), 1));
    }

    #[test]
    fn counts_follow_states() {
        let mut state = with_tasks(3);
        let t = state.lease_next(now()).unwrap();
        state.mark_done(t.id(), None, now());
        state.lease_next(now()).unwrap();

        let counts = state.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.leased, 1);
        assert_eq!(counts.done, 1);
    }

    /// Replays a fixed pseudo-random history of operations and checks the
    /// per-task state sequence and the cursor bound after every step.
    #[test]
    fn random_histories_keep_state_machine_and_cursor_invariants() {
        let mut state = StoreState::new();
        let mut history: Vec<Vec<TaskState>> = Vec::new();
        let mut generations: Vec<u64> = Vec::new();
        let mut last_cursor = 0;
        let mut seed: u64 = 0x5eed;

        for _ in 0..2_000 {
            // xorshift
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;

            let n = state.len().max(1) as u64;
            match seed % 5 {
                0 => {
                    state.create(ContentRef::new("in"));
                    history.push(vec![TaskState::Pending]);
                    generations.push(0);
                }
                1 | 2 => {
                    if let Some(t) = state.lease_next(now()) {
                        generations[t.id().index().unwrap()] = t.lease_generation();
                    }
                }
                3 => {
                    let id = TaskId::new((seed >> 8) % (n + 2));
                    state.mark_done(id, None, now());
                }
                _ => {
                    let id = TaskId::new((seed >> 8) % n);
                    if let Some(i) = id.index().filter(|i| *i < generations.len()) {
                        state.reclaim(id, generations[i]);
                    }
                }
            }

            for (i, task) in state.tasks().iter().enumerate() {
                let seq = &mut history[i];
                if seq.last() != Some(&task.state()) {
                    seq.push(task.state());
                }
            }

            assert!(state.cursor() >= last_cursor, "cursor moved backwards");
            assert!(state.cursor() <= first_not_done(&state), "cursor passed a live task");
            last_cursor = state.cursor();
        }

        for seq in &history {
            // Pending -> (Leased -> Pending)* -> Leased -> Done
            assert_eq!(seq[0], TaskState::Pending);
            for pair in seq.windows(2) {
                let ok = matches!(
                    (pair[0], pair[1]),
                    (TaskState::Pending, TaskState::Leased)
                        | (TaskState::Leased, TaskState::Pending)
                        | (TaskState::Leased, TaskState::Done)
                );
                assert!(ok, "illegal transition {:?} -> {:?}", pair[0], pair[1]);
            }
        }
    }
}
