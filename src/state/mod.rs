mod organizer;

pub use organizer::Organizer;

/// Organize-mode state: idle, or selecting a contiguous run of ungrouped turns.
///
/// Ordinals here index the eligible universe (turns outside any group).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    Selecting {
        anchor: Option<usize>,
        selection: Vec<usize>,
    },
}

/// What a mode change requires of the page (click listeners, highlights).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    EnteredSelecting,
    LeftSelecting,
    Unchanged,
}

#[derive(Clone, Debug, Default)]
pub struct OrganizerSession {
    mode: Mode,
}

impl OrganizerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.mode, Mode::Selecting { .. })
    }

    pub fn anchor(&self) -> Option<usize> {
        match &self.mode {
            Mode::Selecting { anchor, .. } => *anchor,
            Mode::Idle => None,
        }
    }

    pub fn selection(&self) -> &[usize] {
        match &self.mode {
            Mode::Selecting { selection, .. } => selection,
            Mode::Idle => &[],
        }
    }

    pub fn enter(&mut self) -> Transition {
        if self.is_selecting() {
            return Transition::Unchanged;
        }
        self.mode = Mode::Selecting {
            anchor: None,
            selection: vec![],
        };
        Transition::EnteredSelecting
    }

    /// Leave organize mode, dropping anchor and selection.
    pub fn cancel(&mut self) -> Transition {
        if !self.is_selecting() {
            return Transition::Unchanged;
        }
        self.mode = Mode::Idle;
        Transition::LeftSelecting
    }

    /// Drop anchor and selection but stay in organize mode. Eligible ordinals
    /// shift whenever groups appear, so a held anchor would point elsewhere.
    pub fn clear_selection(&mut self) {
        if let Mode::Selecting { anchor, selection } = &mut self.mode {
            *anchor = None;
            selection.clear();
        }
    }

    pub fn toggle(&mut self) -> Transition {
        if self.is_selecting() {
            self.cancel()
        } else {
            self.enter()
        }
    }

    /// Click on eligible ordinal `ordinal`. The first click sets the anchor;
    /// every later click selects the closed range between anchor and click,
    /// replacing the previous selection. Ignored while idle.
    pub fn click(&mut self, ordinal: usize) -> Option<&[usize]> {
        let Mode::Selecting { anchor, selection } = &mut self.mode else {
            return None;
        };
        let a = *anchor.get_or_insert(ordinal);
        let (lo, hi) = (a.min(ordinal), a.max(ordinal));
        *selection = (lo..=hi).collect();
        Some(selection.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_while_idle_is_ignored() {
        let mut s = OrganizerSession::new();
        assert!(s.click(2).is_none());
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_first_click_sets_anchor_and_selects_it() {
        let mut s = OrganizerSession::new();
        assert_eq!(s.enter(), Transition::EnteredSelecting);
        assert_eq!(s.click(3), Some(&[3][..]));
        assert_eq!(s.anchor(), Some(3));
    }

    #[test]
    fn test_range_is_recomputed_from_original_anchor() {
        let mut s = OrganizerSession::new();
        s.enter();
        s.click(3);
        assert_eq!(s.click(1), Some(&[1, 2, 3][..]));
        assert_eq!(s.click(5), Some(&[3, 4, 5][..]));
        assert_eq!(s.anchor(), Some(3));
    }

    #[test]
    fn test_cancel_clears_anchor_and_selection() {
        let mut s = OrganizerSession::new();
        s.enter();
        s.click(0);
        s.click(2);
        assert_eq!(s.cancel(), Transition::LeftSelecting);
        assert_eq!(s.mode(), &Mode::Idle);
        assert_eq!(s.anchor(), None);
        assert!(s.selection().is_empty());
        assert_eq!(s.cancel(), Transition::Unchanged);
    }

    #[test]
    fn test_clear_selection_keeps_mode() {
        let mut s = OrganizerSession::new();
        s.enter();
        s.click(3);
        s.click(4);
        s.clear_selection();
        assert!(s.is_selecting());
        assert_eq!(s.anchor(), None);
        assert_eq!(s.click(1), Some(&[1][..]));
    }

    #[test]
    fn test_toggle_alternates_modes() {
        let mut s = OrganizerSession::new();
        assert_eq!(s.toggle(), Transition::EnteredSelecting);
        assert_eq!(s.toggle(), Transition::LeftSelecting);
        assert!(!s.is_selecting());
    }
}
