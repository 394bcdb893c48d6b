//! # Load Queue
//!
//! Priority queue of pending load tasks. Highest priority pops first; equal
//! priorities pop in arrival order.

use super::entities::LoadTask;
use shared_types::SceneId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry ordered by (priority desc, sequence asc).
#[derive(Debug)]
struct QueuedTask(LoadTask);

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority
            .cmp(&other.0.priority)
            // Earlier arrival wins ties, so it must compare as "greater".
            .then_with(|| other.0.sequence.cmp(&self.0.sequence))
    }
}

/// Pending load tasks.
#[derive(Debug, Default)]
pub struct LoadQueue {
    heap: BinaryHeap<QueuedTask>,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    pub fn push(&mut self, task: LoadTask) {
        self.heap.push(QueuedTask(task));
    }

    /// Remove the highest-priority task.
    pub fn pop(&mut self) -> Option<LoadTask> {
        self.heap.pop().map(|q| q.0)
    }

    /// Check whether a scene already has a queued task.
    pub fn contains(&self, scene_id: &SceneId) -> bool {
        self.heap.iter().any(|q| &q.0.scene_id == scene_id)
    }

    /// Get the queued task for a scene.
    pub fn get(&self, scene_id: &SceneId) -> Option<&LoadTask> {
        self.heap
            .iter()
            .map(|q| &q.0)
            .find(|t| &t.scene_id == scene_id)
    }

    /// Scene ids in the order they would be admitted.
    pub fn pending_order(&self) -> Vec<SceneId> {
        let mut tasks: Vec<&QueuedTask> = self.heap.iter().collect();
        tasks.sort_by(|a, b| b.cmp(a));
        tasks.into_iter().map(|q| q.0.scene_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
