//! The ranked, capacity-bounded memory store.

use chrono::SecondsFormat;
use momo_core::clock::Clock;
use std::sync::Arc;
use tracing::debug;

use crate::item::{DecayCurve, MemoryItem};

/// Memories ordered by descending current importance.
///
/// Every mutation recomputes importance, re-sorts (stable), and trims to
/// capacity, so the lowest-ranked facts are the ones forgotten.
pub struct MemoryStore {
    items: Vec<MemoryItem>,
    capacity: usize,
    curve: DecayCurve,
    clock: Arc<dyn Clock>,
}

/// One line of a [`MemorySnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub id: String,
    pub time: String,
    pub message: String,
}

/// The ranked view of the store that was shown to the model.
///
/// The model refers to memories by position in this view; the snapshot maps
/// positions to stable ids so later additions cannot shift them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
    entries: Vec<SnapshotEntry>,
}

impl MemorySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Id at a model-supplied position; negative or out-of-range gives `None`.
    pub fn id_at(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .map(|e| e.id.as_str())
    }

    /// `[i] time: message` lines, highest-ranked first.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("[{i}] {}: {}", e.time, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl MemoryStore {
    pub fn new(capacity: usize, curve: DecayCurve, clock: Arc<dyn Clock>) -> Self {
        Self {
            items: Vec::new(),
            capacity: capacity.max(1),
            curve,
            clock,
        }
    }

    /// Build a store from existing items, ranking and trimming them.
    pub fn from_items(
        items: Vec<MemoryItem>,
        capacity: usize,
        curve: DecayCurve,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut store = Self::new(capacity, curve, clock);
        store.items = items;
        for item in &mut store.items {
            item.sanitize();
        }
        store.rank();
        store.items.truncate(store.capacity);
        store
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn curve(&self) -> &DecayCurve {
        &self.curve
    }

    /// Items in the order of the last ranking.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryItem> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&MemoryItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Remember a new fact with base importance `1.0 + boost`. Returns its id.
    pub fn add(&mut self, message: impl Into<String>, boost: f64) -> String {
        let now = self.clock.now();
        for item in &mut self.items {
            item.refresh(&self.curve, now);
        }

        let item = MemoryItem::new(message, now, boost);
        let id = item.id().to_string();
        // In front so that the stable sort lets the newest item win exact ties.
        self.items.insert(0, item);
        self.sort();

        if self.items.len() > self.capacity {
            let dropped = self.items.len() - self.capacity;
            self.items.truncate(self.capacity);
            debug!(dropped, capacity = self.capacity, "Trimmed lowest-ranked memories");
        }

        debug!(memory_id = %id, count = self.items.len(), "Memory added");
        id
    }

    /// Boost the memories at `indices` of `view`, typically the last
    /// [`top_k`](Self::top_k) result.
    ///
    /// Indices outside the view, and items no longer in the store, are
    /// ignored. Returns how many boosts were applied.
    pub fn reinforce(&mut self, view: &[MemoryItem], indices: &[i64], boost: f64) -> usize {
        let ids: Vec<String> = indices
            .iter()
            .filter_map(|&i| usize::try_from(i).ok().and_then(|i| view.get(i)))
            .map(|item| item.id().to_string())
            .collect();
        self.reinforce_ids(&ids, boost)
    }

    /// Like [`reinforce`](Self::reinforce), against a snapshot shown to the model.
    pub fn reinforce_snapshot(
        &mut self,
        snapshot: &MemorySnapshot,
        indices: &[i64],
        boost: f64,
    ) -> usize {
        let ids: Vec<String> = indices
            .iter()
            .filter_map(|&i| snapshot.id_at(i).map(str::to_string))
            .collect();
        self.reinforce_ids(&ids, boost)
    }

    /// Boost memories by id. Unknown ids are ignored.
    pub fn reinforce_ids(&mut self, ids: &[String], boost: f64) -> usize {
        let mut applied = 0;
        for id in ids {
            if let Some(item) = self.items.iter_mut().find(|item| item.id() == id) {
                item.reinforce(boost);
                applied += 1;
            }
        }
        if applied > 0 {
            self.rank();
            debug!(applied, boost, "Memories reinforced");
        }
        applied
    }

    /// The `k` highest-ranked memories right now.
    pub fn top_k(&mut self, k: usize) -> Vec<MemoryItem> {
        self.rank();
        self.items.iter().take(k).cloned().collect()
    }

    /// The top `k` as a view the model can refer back to.
    pub fn snapshot(&mut self, k: usize) -> MemorySnapshot {
        let entries = self
            .top_k(k)
            .into_iter()
            .map(|item| SnapshotEntry {
                id: item.id().to_string(),
                time: item.time().to_rfc3339_opts(SecondsFormat::Secs, false),
                message: item.message().to_string(),
            })
            .collect();
        MemorySnapshot { entries }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Recompute every importance and re-sort.
    pub fn rank(&mut self) {
        let now = self.clock.now();
        for item in &mut self.items {
            item.refresh(&self.curve, now);
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.items
            .sort_by(|a, b| b.current_importance().total_cmp(&a.current_importance()));
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.items.len())
            .field("capacity", &self.capacity)
            .field("curve", &self.curve)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use momo_core::clock::ManualClock;

    fn store_with_clock(capacity: usize) -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemoryStore::new(capacity, DecayCurve::weekly(), clock.clone());
        (store, clock)
    }

    #[test]
    fn add_then_top_one_is_the_new_item() {
        let (mut store, _clock) = store_with_clock(10);
        store.add("older", 0.0);
        let id = store.add("newest", 0.0);
        let top = store.top_k(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id(), id);
        assert_eq!(top[0].message(), "newest");
    }

    #[test]
    fn half_life_scenario() {
        let (mut store, clock) = store_with_clock(10);
        store.add("fact A", 0.0);
        clock.advance(Duration::days(7));
        let top = store.top_k(1);
        assert!((top[0].current_importance() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn importance_never_below_floor() {
        let (mut store, clock) = store_with_clock(10);
        store.add("ancient", 0.0);
        clock.advance(Duration::days(3650));
        let top = store.top_k(1);
        assert_eq!(top[0].current_importance(), DecayCurve::MIN_IMPORTANCE);
    }

    #[test]
    fn size_never_exceeds_capacity_and_drops_lowest() {
        let (mut store, clock) = store_with_clock(5);
        store.add("important", 3.0);
        for i in 0..20 {
            clock.advance(Duration::hours(1));
            store.add(format!("fact {i}"), 0.0);
            assert!(store.len() <= 5);
        }
        assert_eq!(store.len(), 5);
        assert!(store.iter().any(|m| m.message() == "important"));
        // The four survivors besides the boosted one are the most recent.
        for i in 16..20 {
            let msg = format!("fact {i}");
            assert!(store.iter().any(|m| m.message() == msg), "missing {msg}");
        }
    }

    #[test]
    fn store_stays_sorted_descending() {
        let (mut store, clock) = store_with_clock(50);
        for i in 0..10 {
            clock.advance(Duration::hours(13));
            store.add(format!("f{i}"), (i % 3) as f64);
        }
        let scores: Vec<f64> = store.iter().map(|m| m.current_importance()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
    }

    #[test]
    fn reinforce_out_of_range_is_a_noop() {
        let (mut store, _clock) = store_with_clock(10);
        store.add("a", 0.0);
        let view = store.top_k(32);
        let before: Vec<f64> = store.iter().map(|m| m.base_importance()).collect();

        assert_eq!(store.reinforce(&view, &[5, -1, i64::MAX], 0.5), 0);

        let after: Vec<f64> = store.iter().map(|m| m.base_importance()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn reinforce_boosts_and_reorders() {
        let (mut store, clock) = store_with_clock(10);
        store.add("first", 0.0);
        clock.advance(Duration::days(1));
        store.add("second", 0.0);

        let snap = store.snapshot(32);
        assert_eq!(snap.entries()[1].message, "first");

        assert_eq!(store.reinforce_snapshot(&snap, &[1], 0.5), 1);
        assert_eq!(store.get(&snap.entries()[1].id).unwrap().base_importance(), 1.5);
        assert_eq!(store.top_k(1)[0].message(), "first");
    }

    #[test]
    fn reinforce_after_add_hits_the_snapshot_item() {
        let (mut store, clock) = store_with_clock(10);
        store.add("coffee", 0.0);
        clock.advance(Duration::hours(1));
        store.add("tea", 0.0);

        let snap = store.snapshot(32);
        // An intervening add shifts raw positions by one.
        store.add("juice", 2.0);
        store.reinforce_snapshot(&snap, &[0], 0.5);

        let tea = store.iter().find(|m| m.message() == "tea").unwrap();
        let juice = store.iter().find(|m| m.message() == "juice").unwrap();
        assert_eq!(tea.base_importance(), 1.5);
        assert_eq!(juice.base_importance(), 3.0);
    }

    #[test]
    fn reinforce_forgotten_item_is_ignored() {
        let (mut store, _clock) = store_with_clock(1);
        store.add("gone soon", 0.0);
        let snap = store.snapshot(32);
        store.add("replacement", 1.0);
        assert_eq!(store.reinforce_snapshot(&snap, &[0], 0.5), 0);
    }

    #[test]
    fn equal_scores_keep_relative_order() {
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let items = vec![
            MemoryItem::new("a", now, 0.0),
            MemoryItem::new("b", now, 0.0),
            MemoryItem::new("c", now, 0.0),
        ];
        let mut store = MemoryStore::from_items(items, 10, DecayCurve::weekly(), clock);
        let order: Vec<String> = store.top_k(3).iter().map(|m| m.message().to_string()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn snapshot_renders_indexed_lines() {
        let (mut store, clock) = store_with_clock(10);
        store.add("likes cats", 0.0);
        clock.advance(Duration::minutes(5));
        store.add("lives in Hangzhou", 0.0);

        let snap = store.snapshot(32);
        let rendered = snap.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[0] "));
        assert!(lines[0].ends_with(": lives in Hangzhou"));
        assert!(lines[1].ends_with(": likes cats"));
    }

    #[test]
    fn snapshot_limited_to_k() {
        let (mut store, _clock) = store_with_clock(10);
        for i in 0..6 {
            store.add(format!("m{i}"), 0.0);
        }
        assert_eq!(store.snapshot(4).len(), 4);
        assert!(store.snapshot(0).is_empty());
    }

    #[test]
    fn from_items_trims_to_capacity() {
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let items: Vec<MemoryItem> = (0..5)
            .map(|i| MemoryItem::new(format!("m{i}"), now, i as f64))
            .collect();
        let store = MemoryStore::from_items(items, 2, DecayCurve::weekly(), clock);
        let kept: Vec<&str> = store.iter().map(|m| m.message()).collect();
        assert_eq!(kept, vec!["m4", "m3"]);
    }
}
