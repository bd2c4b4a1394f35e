/*!
 * Model-Based Property Tests
 *
 * Random submit/release sequences checked step by step against a plain
 * reference model of the granting rules.
 */

use ordered_rwlock::{LockMode, LockState, ReleaseCapability, TaskRwLock};
use parking_lot::Mutex;
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Submit(LockMode),
    Release(usize),
    DoubleRelease(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop_oneof![Just(LockMode::Read), Just(LockMode::Write)].prop_map(Op::Submit),
        2 => any::<usize>().prop_map(Op::Release),
        1 => any::<usize>().prop_map(Op::DoubleRelease),
    ]
}

/// Reference model of the granting rules
#[derive(Default)]
struct Model {
    state: LockState,
    queue: VecDeque<(usize, LockMode)>,
    held: Vec<(usize, LockMode)>,
}

impl Model {
    fn grant(&mut self, index: usize, mode: LockMode) {
        self.state = match (self.state, mode) {
            (LockState::Free, LockMode::Read) => LockState::Reading(1),
            (LockState::Reading(n), LockMode::Read) => LockState::Reading(n + 1),
            (LockState::Free, LockMode::Write) => LockState::Writing,
            (state, mode) => panic!("model granted {mode} while {state:?}"),
        };
        self.held.push((index, mode));
    }

    fn submit(&mut self, index: usize, mode: LockMode) {
        if self.queue.is_empty() && self.state.admits(mode) {
            self.grant(index, mode);
        } else {
            self.queue.push_back((index, mode));
        }
    }

    fn release(&mut self, index: usize) {
        let pos = self.held.iter().position(|(i, _)| *i == index).unwrap();
        let (_, mode) = self.held.remove(pos);
        self.state = match (self.state, mode) {
            (LockState::Reading(1), _) | (LockState::Writing, _) => LockState::Free,
            (LockState::Reading(n), _) => LockState::Reading(n - 1),
            (LockState::Free, _) => panic!("model released while free"),
        };

        if self.state != LockState::Free {
            return;
        }
        if let Some((index, mode)) = self.queue.pop_front() {
            self.grant(index, mode);
            if mode == LockMode::Read {
                while let Some(&(index, LockMode::Read)) = self.queue.front() {
                    self.queue.pop_front();
                    self.grant(index, LockMode::Read);
                }
            }
        }
    }

    fn held_indices(&self) -> Vec<usize> {
        let mut held: Vec<_> = self.held.iter().map(|(i, _)| *i).collect();
        held.sort_unstable();
        held
    }
}

type Granted = Arc<Mutex<Vec<(usize, ReleaseCapability)>>>;

/// Remove the `pick`-th held capability, releasing the mutex before returning
fn take_held(granted: &Granted, pick: usize) -> Option<(usize, ReleaseCapability)> {
    let mut held = granted.lock();
    if held.is_empty() {
        return None;
    }
    let len = held.len();
    Some(held.remove(pick % len))
}

fn held_indices(granted: &Granted) -> Vec<usize> {
    let mut held: Vec<_> = granted.lock().iter().map(|(i, _)| *i).collect();
    held.sort_unstable();
    held
}

fn check(lock: &TaskRwLock, model: &Model, granted: &Granted) -> Result<(), TestCaseError> {
    prop_assert_eq!(lock.state(), model.state);
    prop_assert_eq!(lock.pending(), model.queue.len());
    prop_assert_eq!(held_indices(granted), model.held_indices());
    if lock.state() == LockState::Free {
        prop_assert_eq!(lock.pending(), 0);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_lock_follows_model(ops in vec(op_strategy(), 1..120)) {
        let lock = TaskRwLock::new();
        let granted: Granted = Arc::new(Mutex::new(Vec::new()));
        let start_order = Arc::new(Mutex::new(Vec::new()));
        let mut model = Model::default();
        let mut submitted = 0;

        for op in ops {
            match op {
                Op::Submit(mode) => {
                    let index = submitted;
                    submitted += 1;
                    let granted = granted.clone();
                    let start_order = start_order.clone();
                    lock.execute(mode, move |release| {
                        start_order.lock().push(index);
                        granted.lock().push((index, release));
                    })
                    .unwrap();
                    model.submit(index, mode);
                }
                Op::Release(pick) => {
                    if let Some((index, release)) = take_held(&granted, pick) {
                        prop_assert!(release.release());
                        model.release(index);
                    }
                }
                Op::DoubleRelease(pick) => {
                    if let Some((index, release)) = take_held(&granted, pick) {
                        prop_assert!(release.release());
                        model.release(index);
                        let before = lock.state();
                        prop_assert!(!release.release());
                        prop_assert_eq!(lock.state(), before);
                    }
                }
            }
            check(&lock, &model, &granted)?;
        }

        // Drain everything that is left
        while let Some((index, release)) = take_held(&granted, 0) {
            release.release();
            model.release(index);
            check(&lock, &model, &granted)?;
        }

        prop_assert!(lock.is_free());
        // Grants start in strict submission order
        let order = start_order.lock().clone();
        prop_assert_eq!(order, (0..submitted).collect::<Vec<_>>());
    }

    #[test]
    fn prop_queued_readers_batch_between_writers(
        groups in vec((any::<bool>(), 1usize..6), 1..12)
    ) {
        let lock = TaskRwLock::new();
        let granted: Granted = Arc::new(Mutex::new(Vec::new()));

        // Gate everything behind one writer
        let gate: Granted = Arc::new(Mutex::new(Vec::new()));
        let slot = gate.clone();
        lock.execute_write(move |release| slot.lock().push((0, release))).unwrap();

        let mut index = 0;
        let mut expected_batches = Vec::new();
        let mut last_was_read = false;
        for (is_write, len) in groups {
            for _ in 0..(if is_write { 1 } else { len }) {
                let mode = if is_write { LockMode::Write } else { LockMode::Read };
                let granted = granted.clone();
                let this = index;
                lock.execute(mode, move |release| granted.lock().push((this, release))).unwrap();
                index += 1;

                if is_write {
                    expected_batches.push(1);
                } else if last_was_read {
                    *expected_batches.last_mut().unwrap() += 1;
                } else {
                    expected_batches.push(1);
                }
                last_was_read = !is_write;
            }
        }

        drop(take_held(&gate, 0));

        for expected in expected_batches {
            let batch = std::mem::take(&mut *granted.lock());
            prop_assert_eq!(batch.len(), expected);
            drop(batch);
        }
        prop_assert!(lock.is_free());
    }
}
