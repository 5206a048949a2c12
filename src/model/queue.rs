//! Play queue with wrap-around navigation.

use super::track::SharedTrack;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Step from `position` in a queue of `len` tracks, wrapping at both ends.
pub fn wrap_index(position: usize, len: usize, direction: Direction) -> usize {
    debug_assert!(len > 0);
    match direction {
        Direction::Next => (position + 1) % len,
        Direction::Previous => (position + len - 1) % len,
    }
}

#[derive(Clone, Debug, Default)]
pub struct Queue {
    tracks: Vec<SharedTrack>,
    position: Option<usize>,
}

impl Queue {
    pub fn new(tracks: Vec<SharedTrack>) -> Self {
        Self {
            tracks,
            position: None,
        }
    }

    pub fn replace(&mut self, tracks: Vec<SharedTrack>, position: Option<usize>) {
        self.position = position.filter(|p| *p < tracks.len());
        self.tracks = tracks;
    }

    pub fn tracks(&self) -> &[SharedTrack] {
        &self.tracks
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<&SharedTrack> {
        self.position.and_then(|p| self.tracks.get(p))
    }

    pub fn select(&mut self, index: usize) -> Option<SharedTrack> {
        let track = self.tracks.get(index)?.clone();
        self.position = Some(index);
        Some(track)
    }

    /// Point the queue at the track with `track_id`, if it is queued.
    pub fn locate(&mut self, track_id: &str) -> Option<usize> {
        if self.current().is_some_and(|t| t.id == track_id) {
            return self.position;
        }
        let index = self.tracks.iter().position(|t| t.id == track_id)?;
        self.position = Some(index);
        Some(index)
    }

    /// Move one step and return the new current track.
    ///
    /// With no position yet, `Next` starts at the first track and `Previous`
    /// at the last one.
    pub fn advance(&mut self, direction: Direction) -> Option<SharedTrack> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        let next = match (self.position, direction) {
            (Some(p), _) if p < len => wrap_index(p, len, direction),
            (_, Direction::Next) => 0,
            (_, Direction::Previous) => len - 1,
        };
        self.select(next)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Track;

    fn queue_of(n: usize) -> Queue {
        Queue::new(
            (0..n)
                .map(|i| Arc::new(Track::new(i.to_string(), format!("t{i}"), "a", "b", 60)))
                .collect(),
        )
    }

    #[test]
    fn next_from_last_wraps_to_first() {
        let mut q = queue_of(3);
        q.select(2);
        assert_eq!(q.advance(Direction::Next).unwrap().id, "0");
        assert_eq!(q.position(), Some(0));
    }

    #[test]
    fn previous_from_first_wraps_to_last() {
        let mut q = queue_of(3);
        q.select(0);
        assert_eq!(q.advance(Direction::Previous).unwrap().id, "2");
        assert_eq!(q.position(), Some(2));
    }

    #[test]
    fn wrap_index_over_every_position() {
        for len in 1..6 {
            for p in 0..len {
                let next = wrap_index(p, len, Direction::Next);
                let prev = wrap_index(p, len, Direction::Previous);
                assert_eq!(wrap_index(next, len, Direction::Previous), p);
                assert_eq!(wrap_index(prev, len, Direction::Next), p);
            }
            assert_eq!(wrap_index(len - 1, len, Direction::Next), 0);
            assert_eq!(wrap_index(0, len, Direction::Previous), len - 1);
        }
    }

    #[test]
    fn single_track_queue_wraps_onto_itself() {
        let mut q = queue_of(1);
        q.select(0);
        assert_eq!(q.advance(Direction::Next).unwrap().id, "0");
        assert_eq!(q.advance(Direction::Previous).unwrap().id, "0");
    }

    #[test]
    fn empty_queue_has_nothing_to_advance_to() {
        let mut q = Queue::default();
        assert!(q.advance(Direction::Next).is_none());
        assert!(q.advance(Direction::Previous).is_none());
    }

    #[test]
    fn unpositioned_queue_starts_at_the_matching_end() {
        let mut q = queue_of(4);
        assert_eq!(q.advance(Direction::Next).unwrap().id, "0");
        let mut q = queue_of(4);
        assert_eq!(q.advance(Direction::Previous).unwrap().id, "3");
    }

    #[test]
    fn locate_and_replace_keep_position_in_range() {
        let mut q = queue_of(4);
        assert_eq!(q.locate("2"), Some(2));
        assert_eq!(q.locate("missing"), None);
        assert_eq!(q.position(), Some(2));

        q.replace(queue_of(2).tracks().to_vec(), Some(5));
        assert_eq!(q.position(), None);
        assert_eq!(q.tracks().len(), 2);
    }
}
