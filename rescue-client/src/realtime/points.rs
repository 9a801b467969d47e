//! Live point set
//!
//! Snapshots are immutable `Arc<Vec<Arc<GeoPoint>>>` values. Every change
//! produces a new outer vector, so observers detect change by pointer
//! identity; untouched entries keep sharing their `Arc` with the previous
//! snapshot.

use shared::models::{GeoPoint, StreamMessage};
use std::collections::HashMap;
use std::sync::Arc;

/// Published view of the point set
pub type PointSnapshot = Arc<Vec<Arc<GeoPoint>>>;

/// What a message did to the set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Replaced { count: usize },
    Updated { id: String },
    Inserted { id: String },
    /// Single cluster point: no identity to merge by
    Rejected,
}

/// Point set plus id → position index
#[derive(Debug, Default)]
pub struct PointSet {
    snapshot: PointSnapshot,
    index: HashMap<String, usize>,
}

impl PointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PointSnapshot {
        self.snapshot.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<GeoPoint>> {
        self.index.get(id).and_then(|&i| self.snapshot.get(i))
    }

    /// Replace the whole set (seed result or batch message)
    pub fn replace(&mut self, points: Vec<GeoPoint>) -> MergeOutcome {
        let points: Vec<Arc<GeoPoint>> = points.into_iter().map(Arc::new).collect();
        self.index = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.id().map(|id| (id.to_string(), i)))
            .collect();
        let count = points.len();
        self.snapshot = Arc::new(points);
        MergeOutcome::Replaced { count }
    }

    /// Merge one point by id: replace in place or append
    pub fn merge(&mut self, point: GeoPoint) -> MergeOutcome {
        let Some(id) = point.id().map(str::to_string) else {
            return MergeOutcome::Rejected;
        };

        let mut next: Vec<Arc<GeoPoint>> = Vec::with_capacity(self.snapshot.len() + 1);
        next.extend(self.snapshot.iter().cloned());

        let outcome = match self.index.get(&id) {
            Some(&i) => {
                next[i] = Arc::new(point);
                MergeOutcome::Updated { id }
            }
            None => {
                self.index.insert(id.clone(), next.len());
                next.push(Arc::new(point));
                MergeOutcome::Inserted { id }
            }
        };

        self.snapshot = Arc::new(next);
        outcome
    }

    /// Apply one stream message
    pub fn apply(&mut self, message: StreamMessage) -> MergeOutcome {
        match message {
            StreamMessage::Batch(points) => self.replace(points),
            StreamMessage::Single(point) => self.merge(point),
        }
    }
}
