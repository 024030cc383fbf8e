use crate::host::HostDocument;

/// Which turns an index counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Universe {
    /// Every attached turn, grouped or not. Used for persistence.
    Full,
    /// Only turns outside any group. Used for selection.
    Eligible,
}

/// Snapshot of the turn list in document order.
///
/// Never cache one across a mutation: ordinals are only meaningful against the
/// render they were computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct OrdinalIndex<T> {
    universe: Universe,
    turns: Vec<T>,
}

impl<T: Clone + PartialEq> OrdinalIndex<T> {
    pub fn snapshot<D>(doc: &D, universe: Universe) -> Self
    where
        D: HostDocument<Turn = T>,
    {
        let turns = match universe {
            Universe::Full => doc.turns(),
            Universe::Eligible => doc
                .turns()
                .into_iter()
                .filter(|t| doc.enclosing_group(t).is_none())
                .collect(),
        };
        Self { universe, turns }
    }

    pub fn full<D>(doc: &D) -> Self
    where
        D: HostDocument<Turn = T>,
    {
        Self::snapshot(doc, Universe::Full)
    }

    pub fn eligible<D>(doc: &D) -> Self
    where
        D: HostDocument<Turn = T>,
    {
        Self::snapshot(doc, Universe::Eligible)
    }

    pub fn universe(&self) -> Universe {
        self.universe
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&T> {
        self.turns.get(ordinal)
    }

    pub fn ordinal_of(&self, turn: &T) -> Option<usize> {
        self.turns.iter().position(|t| t == turn)
    }

    pub fn turns(&self) -> &[T] {
        &self.turns
    }
}
