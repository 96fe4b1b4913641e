use super::record::TimelineEntry;
use super::store::TimelineStore;

/// Result of asking for a neighbouring position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    At(usize),
    /// Before the first entry. Older history has to be requested; retry
    /// once it has arrived.
    NeedOlder,
    /// Past the last entry. Terminal, not an error.
    End,
}

/// Read-only projection of a [`TimelineStore`] for the rendering layer.
#[derive(Debug, Clone, Copy)]
pub struct TimelineView<'a> {
    store: &'a TimelineStore,
}

impl<'a> TimelineView<'a> {
    pub fn new(store: &'a TimelineStore) -> Self {
        Self { store }
    }

    /// Everything currently held, sentinel first when present.
    pub fn entries(&self) -> &'a [TimelineEntry] {
        self.store.entries()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn focus(&self) -> Option<usize> {
        self.store.get_focus()
    }

    pub fn get(&self, position: usize) -> Option<&'a TimelineEntry> {
        self.entries().get(position)
    }

    pub fn next_position(&self, position: usize) -> Step {
        if position + 1 >= self.len() {
            Step::End
        } else {
            Step::At(position + 1)
        }
    }

    pub fn prev_position(&self, position: usize) -> Step {
        if position == 0 || self.is_empty() {
            Step::NeedOlder
        } else {
            Step::At(position.min(self.len()) - 1)
        }
    }

    pub fn positions(&self, reverse: bool) -> Box<dyn Iterator<Item = usize>> {
        let len = self.len();
        if reverse {
            Box::new((0..len).rev())
        } else {
            Box::new(0..len)
        }
    }

    /// Entries paired with whether each one holds the focus.
    pub fn rows(&self) -> impl Iterator<Item = (&'a TimelineEntry, bool)> + 'a {
        let focus = self.focus();
        self.entries()
            .iter()
            .enumerate()
            .map(move |(idx, entry)| (entry, Some(idx) == focus))
    }
}
