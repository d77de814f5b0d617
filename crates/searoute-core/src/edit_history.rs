//! Undo/redo history for manually edited route polylines.

use crate::error::NeedMorePoints;
use crate::models::GeoPoint;
use crate::smoothing;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::watch;

/// Hard cap on retained checkpoints.
pub const MAX_HISTORY: usize = 50;

/// Decimal places compared when deciding whether the polyline changed.
const FINGERPRINT_SCALE: f64 = 1e6;

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Route(Vec<GeoPoint>),
    /// Deliberate "cleared" checkpoint.
    Cleared,
    /// Null found in the middle of a restored history. Never produced by
    /// editing; navigation steps over it.
    Gap,
}

impl Entry {
    fn vertices(&self) -> Option<&[GeoPoint]> {
        match self {
            Entry::Route(v) => Some(v),
            Entry::Cleared | Entry::Gap => None,
        }
    }
}

/// Result of an undo or redo request.
#[derive(Debug, PartialEq)]
pub enum Navigation<'a> {
    /// Cursor moved; `None` means the restored checkpoint is the cleared state.
    Moved(Option<&'a [GeoPoint]>),
    AtOldest,
    AtNewest,
}

/// Bounded checkpoint log with a cursor.
#[derive(Debug, Clone)]
pub struct EditHistory {
    capacity: usize,
    entries: VecDeque<Entry>,
    cursor: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EditHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            cursor: 0,
        }
    }

    /// Rebuild a history from externally stored snapshots, where `None` is a
    /// null entry. A leading null is the cleared marker; later nulls become
    /// gaps that undo/redo skip. Oldest entries beyond the cap are dropped.
    pub fn restore(snapshots: Vec<Option<Vec<GeoPoint>>>, cursor: usize) -> Self {
        let mut history = Self::new();
        let overflow = snapshots.len().saturating_sub(history.capacity);
        for (index, snapshot) in snapshots.into_iter().enumerate() {
            let entry = match snapshot {
                Some(vertices) => Entry::Route(vertices),
                None if index == 0 => Entry::Cleared,
                None => Entry::Gap,
            };
            history.entries.push_back(entry);
        }
        for _ in 0..overflow {
            history.entries.pop_front();
        }
        if history.entries.is_empty() {
            return history;
        }

        let mut cursor = cursor.saturating_sub(overflow).min(history.entries.len() - 1);
        while cursor > 0 && history.entries[cursor] == Entry::Gap {
            cursor -= 1;
        }
        history.cursor = cursor;
        history
    }

    /// Record a polyline checkpoint.
    pub fn push(&mut self, vertices: Vec<GeoPoint>) {
        self.push_entry(Entry::Route(vertices));
    }

    /// Record the deliberate cleared state.
    pub fn push_cleared(&mut self) {
        self.push_entry(Entry::Cleared);
    }

    fn push_entry(&mut self, entry: Entry) {
        if self.entries.is_empty() {
            self.entries.push_back(entry);
            self.cursor = 0;
            return;
        }

        // Undone entries are discarded when a new edit branches off.
        if self.cursor < self.entries.len() - 1 {
            self.entries.truncate(self.cursor + 1);
        }

        self.entries.push_back(entry);
        self.cursor = self.entries.len() - 1;

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    pub fn undo(&mut self) -> Navigation<'_> {
        let target = (0..self.cursor)
            .rev()
            .find(|&i| self.entries[i] != Entry::Gap);
        match target {
            Some(index) => {
                self.cursor = index;
                Navigation::Moved(self.entries[index].vertices())
            }
            None => Navigation::AtOldest,
        }
    }

    pub fn redo(&mut self) -> Navigation<'_> {
        let target = (self.cursor + 1..self.entries.len()).find(|&i| self.entries[i] != Entry::Gap);
        match target {
            Some(index) => {
                self.cursor = index;
                Navigation::Moved(self.entries[index].vertices())
            }
            None => Navigation::AtNewest,
        }
    }

    /// Polyline at the cursor; `None` when empty or cleared.
    pub fn current(&self) -> Option<&[GeoPoint]> {
        self.entries.get(self.cursor).and_then(Entry::vertices)
    }

    /// Cursor index, or `None` for an empty history.
    pub fn cursor(&self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        (0..self.cursor).any(|i| self.entries[i] != Entry::Gap)
    }

    pub fn can_redo(&self) -> bool {
        (self.cursor + 1..self.entries.len()).any(|i| self.entries[i] != Entry::Gap)
    }

    /// Snapshots oldest first; cleared markers and gaps read as `None`.
    pub fn iter(&self) -> impl Iterator<Item = Option<&[GeoPoint]>> + '_ {
        self.entries.iter().map(Entry::vertices)
    }
}

/// Vertices rounded to six decimals, so float noise does not register as an edit.
pub fn fingerprint(vertices: &[GeoPoint]) -> Vec<[i64; 2]> {
    vertices
        .iter()
        .map(|v| {
            [
                (v.lat() * FINGERPRINT_SCALE).round() as i64,
                (v.lon() * FINGERPRINT_SCALE).round() as i64,
            ]
        })
        .collect()
}

/// The map drawing capability the controller edits through.
pub trait DrawingSurface {
    /// Current vertex array of the drawn polyline.
    fn vertices(&self) -> Vec<GeoPoint>;

    /// Replace the drawn polyline.
    fn set_vertices(&mut self, vertices: &[GeoPoint]);

    /// Change notifications, if the surface can emit them. Without them the
    /// edit session falls back to periodic polling.
    fn change_notifications(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}

/// In-memory drawing surface.
#[derive(Debug, Default)]
pub struct MemorySurface {
    vertices: Vec<GeoPoint>,
    changes: Option<watch::Sender<u64>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that publishes a change counter on every mutation.
    pub fn with_notifications() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            vertices: Vec::new(),
            changes: Some(tx),
        }
    }

    /// Move one vertex, as a user drag would.
    pub fn drag_vertex(&mut self, index: usize, to: GeoPoint) -> bool {
        match self.vertices.get_mut(index) {
            Some(vertex) => {
                *vertex = to;
                self.notify();
                true
            }
            None => false,
        }
    }

    fn notify(&self) {
        if let Some(tx) = &self.changes {
            tx.send_modify(|n| *n += 1);
        }
    }
}

impl DrawingSurface for MemorySurface {
    fn vertices(&self) -> Vec<GeoPoint> {
        self.vertices.clone()
    }

    fn set_vertices(&mut self, vertices: &[GeoPoint]) {
        self.vertices = vertices.to_vec();
        self.notify();
    }

    fn change_notifications(&self) -> Option<watch::Receiver<u64>> {
        self.changes.as_ref().map(watch::Sender::subscribe)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// Nothing drawn
    Idle,
    /// A committed polyline, not mid-edit
    HasRoute,
    /// Vertices are being dragged; checkpoints are taken on change
    Editing,
}

/// User-facing reasons an action did nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditNotice {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("no route drawn")]
    NoRoute,
    #[error("a route needs at least two points")]
    TooFewPoints,
    #[error(transparent)]
    NeedMorePoints(#[from] NeedMorePoints),
}

/// Edit-session state machine over a [`DrawingSurface`].
#[derive(Debug)]
pub struct EditHistoryController<S> {
    surface: S,
    history: EditHistory,
    state: EditState,
    last_recorded: Option<Vec<[i64; 2]>>,
}

impl<S: DrawingSurface> EditHistoryController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            history: EditHistory::new(),
            state: EditState::Idle,
            last_recorded: None,
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// A new polyline from the drawing tool.
    pub fn draw(&mut self, vertices: Vec<GeoPoint>) -> Result<(), EditNotice> {
        if vertices.len() < 2 {
            return Err(EditNotice::TooFewPoints);
        }
        if self.state == EditState::Editing {
            self.stop_edit();
        }
        self.surface.set_vertices(&vertices);
        self.record(vertices);
        self.state = EditState::HasRoute;
        Ok(())
    }

    /// Begin dragging vertices. The pre-edit polyline is checkpointed first
    /// so undo can return to it.
    pub fn start_edit(&mut self) -> Result<(), EditNotice> {
        match self.state {
            EditState::Idle => Err(EditNotice::NoRoute),
            EditState::Editing => Ok(()),
            EditState::HasRoute => {
                let current = self.surface.vertices();
                if self.history.current().map(fingerprint) != Some(fingerprint(&current)) {
                    self.record(current);
                } else {
                    self.last_recorded = Some(fingerprint(&current));
                }
                self.state = EditState::Editing;
                Ok(())
            }
        }
    }

    /// Checkpoint the surface if it changed since the last checkpoint.
    /// Only active while editing; returns whether a checkpoint was pushed.
    pub fn poll(&mut self) -> bool {
        if self.state != EditState::Editing {
            return false;
        }
        let vertices = self.surface.vertices();
        let print = fingerprint(&vertices);
        if self.last_recorded.as_ref() == Some(&print) {
            return false;
        }
        self.history.push(vertices);
        self.last_recorded = Some(print);
        true
    }

    /// Final poll, then back to [`EditState::HasRoute`].
    pub fn stop_edit(&mut self) -> bool {
        if self.state != EditState::Editing {
            return false;
        }
        let pushed = self.poll();
        self.state = EditState::HasRoute;
        pushed
    }

    /// Remove the polyline, leaving a cleared checkpoint.
    pub fn clear(&mut self) -> Result<(), EditNotice> {
        if self.state == EditState::Idle {
            return Err(EditNotice::NoRoute);
        }
        self.stop_edit();
        self.surface.set_vertices(&[]);
        self.history.push_cleared();
        self.last_recorded = None;
        self.state = EditState::Idle;
        Ok(())
    }

    pub fn undo(&mut self) -> Result<(), EditNotice> {
        self.stop_edit();
        let restored = match self.history.undo() {
            Navigation::Moved(snapshot) => snapshot.map(<[GeoPoint]>::to_vec),
            Navigation::AtOldest | Navigation::AtNewest => return Err(EditNotice::NothingToUndo),
        };
        self.apply(restored);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EditNotice> {
        self.stop_edit();
        let restored = match self.history.redo() {
            Navigation::Moved(snapshot) => snapshot.map(<[GeoPoint]>::to_vec),
            Navigation::AtOldest | Navigation::AtNewest => return Err(EditNotice::NothingToRedo),
        };
        self.apply(restored);
        Ok(())
    }

    /// One smoothing pass over the drawn polyline, recorded as a checkpoint.
    pub fn smooth(&mut self) -> Result<(), EditNotice> {
        if self.state == EditState::Idle {
            return Err(EditNotice::NoRoute);
        }
        self.stop_edit();
        let smoothed = smoothing::smooth(&self.surface.vertices())?;
        self.surface.set_vertices(&smoothed);
        self.record(smoothed);
        Ok(())
    }

    fn record(&mut self, vertices: Vec<GeoPoint>) {
        self.last_recorded = Some(fingerprint(&vertices));
        self.history.push(vertices);
    }

    fn apply(&mut self, restored: Option<Vec<GeoPoint>>) {
        match restored {
            Some(vertices) => {
                self.surface.set_vertices(&vertices);
                self.last_recorded = Some(fingerprint(&vertices));
                self.state = EditState::HasRoute;
            }
            None => {
                self.surface.set_vertices(&[]);
                self.last_recorded = None;
                self.state = EditState::Idle;
            }
        }
    }
}
