use std::collections::{HashMap, HashSet};

use crate::control::{ControlId, LikeControl};
use crate::{CurtidasError, CurtidasResult, PostId};

/// Subscription registry of every on-screen like control, keyed by the
/// post each one represents. All state mutation flows through here so
/// that a confirmed toggle reaches every copy of the same fact in one
/// pass.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    controls: HashMap<ControlId, LikeControl>,
    next_id: u32,
    in_flight: HashSet<PostId>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ***
    // Binding
    // ***

    /// Register a control and hand out its id. Each call binds exactly
    /// one handler; replacing an existing binding goes through
    /// [`ControlRegistry::rebind`] so a control can never fire twice.
    pub fn bind(&mut self, mut control: LikeControl) -> ControlId {
        self.next_id += 1;
        let id = ControlId(self.next_id);
        control.id = id;
        self.controls.insert(id, control);
        id
    }

    /// Replace the binding for an existing id. No-op id allocation:
    /// the caller keeps the handle it already had.
    pub fn rebind(&mut self, id: ControlId, mut control: LikeControl) -> CurtidasResult<()> {
        if !self.controls.contains_key(&id) {
            return Err(CurtidasError::UnknownControl { id: id.0 }.into());
        }
        control.id = id;
        self.controls.insert(id, control);
        Ok(())
    }

    pub fn unbind(&mut self, id: ControlId) -> Option<LikeControl> {
        self.controls.remove(&id)
    }

    pub fn get(&self, id: ControlId) -> Option<&LikeControl> {
        self.controls.get(&id)
    }

    // ***
    // Toggle bookkeeping
    // ***

    /// Latch a post for an in-flight toggle. Returns false when a
    /// toggle for that post is already running; the caller must drop
    /// the interaction.
    pub fn begin_toggle(&mut self, post: PostId) -> bool {
        self.in_flight.insert(post)
    }

    pub fn finish_toggle(&mut self, post: PostId) {
        self.in_flight.remove(&post);
    }

    /// Fan a confirmed toggle out to every control bound for `post`.
    /// The pre-toggle liked flag decides the direction for all copies,
    /// which are known to have agreed before the toggle.
    pub fn apply_toggle(&mut self, post: PostId, was_liked: bool, total_likes: u32) {
        for control in self.controls.values_mut() {
            if control.post_id != post {
                continue;
            }
            control.liked = !was_liked;
            control.count = total_likes;
        }
    }

    /// Mark every control whose post appears in `liked` as liked.
    /// Used when priming from the favorites listing.
    pub fn mark_liked(&mut self, liked: &HashSet<PostId>) -> usize {
        let mut touched = 0;
        for control in self.controls.values_mut() {
            if liked.contains(&control.post_id) && !control.liked {
                control.liked = true;
                touched += 1;
            }
        }
        touched
    }

    // ***
    // Helpers
    // ***

    pub fn controls_for_post(&self, post: PostId) -> Vec<&LikeControl> {
        let mut matches: Vec<&LikeControl> = self
            .controls
            .values()
            .filter(|control| control.post_id == post)
            .collect();
        matches.sort_by_key(|control| control.id);
        matches
    }

    pub fn snapshot(&self) -> Vec<LikeControl> {
        let mut all: Vec<LikeControl> = self.controls.values().cloned().collect();
        all.sort_by_key(|control| control.id);
        all
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
