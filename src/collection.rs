use std::collections::HashSet;

use crate::goodvibes::{Reply, Vibe};

/// Vibes ordered newest first, unique by id.
#[derive(Debug, Clone, Default)]
pub struct VibeCollection {
    vibes: Vec<Vibe>,
}

impl VibeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from a backend page; later duplicates are dropped.
    pub fn from_vibes(vibes: Vec<Vibe>) -> Self {
        let mut collection = Self::new();
        collection.merge(vibes);
        collection
    }

    pub fn len(&self) -> usize {
        self.vibes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vibes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Vibe> {
        self.vibes.get(index)
    }

    pub fn as_slice(&self) -> &[Vibe] {
        &self.vibes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vibe> {
        self.vibes.iter()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.vibes.iter().position(|vibe| vibe.id == id)
    }

    /// Appends vibes with unseen ids and re-sorts by creation date, newest first.
    ///
    /// Existing entries win over incoming duplicates so replies attached
    /// earlier survive. The sort is stable, so vibes sharing a timestamp keep
    /// the order the backend sent them in. Returns how many vibes were added.
    pub fn merge(&mut self, incoming: Vec<Vibe>) -> usize {
        let mut seen: HashSet<String> = self.vibes.iter().map(|vibe| vibe.id.clone()).collect();
        let before = self.vibes.len();
        for vibe in incoming {
            if seen.insert(vibe.id.clone()) {
                self.vibes.push(vibe);
            }
        }
        let added = self.vibes.len() - before;
        if added > 0 {
            self.vibes
                .sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        }
        added
    }

    /// Attaches a fetched reply list; a list that is already present is kept.
    pub fn attach_replies(&mut self, id: &str, replies: Vec<Reply>) -> bool {
        match self.vibes.iter_mut().find(|vibe| vibe.id == id) {
            Some(vibe) if vibe.replies.is_none() => {
                vibe.replies = Some(replies);
                true
            }
            _ => false,
        }
    }
}
