//! Like/dislike reactions on assistant replies

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn label(&self) -> &'static str {
        match self {
            Reaction::Like => "liked",
            Reaction::Dislike => "disliked",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Reaction::Like => "👍",
            Reaction::Dislike => "👎",
        }
    }
}

/// Reactions keyed by message position. Like and dislike exclude each other.
#[derive(Debug, Default, Clone)]
pub struct Feedback {
    reactions: HashMap<usize, Reaction>,
}

impl Feedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle `reaction` on message `index` and return the resulting state.
    ///
    /// Choosing the active reaction clears it; choosing the other one switches.
    pub fn toggle(&mut self, index: usize, reaction: Reaction) -> Option<Reaction> {
        let next = match self.reactions.get(&index) {
            Some(current) if *current == reaction => None,
            _ => Some(reaction),
        };
        match next {
            Some(r) => {
                self.reactions.insert(index, r);
                tracing::info!(message = index, reaction = r.label(), "feedback recorded");
            }
            None => {
                self.reactions.remove(&index);
                tracing::info!(message = index, "feedback cleared");
            }
        }
        next
    }

    pub fn get(&self, index: usize) -> Option<Reaction> {
        self.reactions.get(&index).copied()
    }

    /// Forget the reaction on one message (its text was regenerated)
    pub fn reset(&mut self, index: usize) {
        self.reactions.remove(&index);
    }

    /// A message was inserted at `index`: reactions at or after it move down one position
    pub fn shift_from(&mut self, index: usize) {
        self.reactions = self
            .reactions
            .drain()
            .map(|(i, r)| if i >= index { (i + 1, r) } else { (i, r) })
            .collect();
    }

    pub fn clear(&mut self) {
        self.reactions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_on_and_off() {
        let mut feedback = Feedback::new();
        assert_eq!(feedback.toggle(1, Reaction::Like), Some(Reaction::Like));
        assert_eq!(feedback.get(1), Some(Reaction::Like));
        assert_eq!(feedback.toggle(1, Reaction::Like), None);
        assert_eq!(feedback.get(1), None);
    }

    #[test]
    fn test_like_and_dislike_are_exclusive() {
        let mut feedback = Feedback::new();
        feedback.toggle(3, Reaction::Like);
        assert_eq!(feedback.toggle(3, Reaction::Dislike), Some(Reaction::Dislike));
        assert_eq!(feedback.get(3), Some(Reaction::Dislike));
    }

    #[test]
    fn test_reactions_are_per_message() {
        let mut feedback = Feedback::new();
        feedback.toggle(1, Reaction::Like);
        feedback.toggle(3, Reaction::Dislike);
        feedback.reset(1);
        assert_eq!(feedback.get(1), None);
        assert_eq!(feedback.get(3), Some(Reaction::Dislike));
        feedback.clear();
        assert_eq!(feedback.get(3), None);
    }

    #[test]
    fn test_reactions_follow_shifted_messages() {
        let mut feedback = Feedback::new();
        feedback.toggle(1, Reaction::Like);
        feedback.toggle(4, Reaction::Dislike);
        feedback.shift_from(2);
        assert_eq!(feedback.get(1), Some(Reaction::Like));
        assert_eq!(feedback.get(4), None);
        assert_eq!(feedback.get(5), Some(Reaction::Dislike));
    }
}
