use super::{OrganizerSession, Transition};
use crate::error::{OrganizerError, OrganizerResult};
use crate::host::HostDocument;
use crate::index::OrdinalIndex;
use crate::models::{SaveRequest, SavedGroup, SessionKey};
use crate::sync::{collect_saved_groups, reconcile, ReconcileOutcome};
use leptos::logging::log;

/// Controller for one page lifetime.
///
/// Owns the host document handle, the session key and the organize-mode state.
/// Every mutation re-derives ordinals from the page and returns the full
/// grouping as a [`SaveRequest`]; the caller hands it to the store without
/// waiting for the write.
///
/// `None` from a mutation means the user aborted (blank name, declined
/// confirmation, empty selection) and nothing changed.
pub struct Organizer<D: HostDocument> {
    doc: D,
    session_key: Option<SessionKey>,
    session: OrganizerSession,
}

fn clean_name(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

impl<D: HostDocument> Organizer<D> {
    pub fn new(doc: D, session_key: Option<SessionKey>) -> Self {
        Self {
            doc,
            session_key,
            session: OrganizerSession::new(),
        }
    }

    pub fn doc(&self) -> &D {
        &self.doc
    }

    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    pub fn session(&self) -> &OrganizerSession {
        &self.session
    }

    pub fn is_selecting(&self) -> bool {
        self.session.is_selecting()
    }

    pub fn selection_len(&self) -> usize {
        self.session.selection().len()
    }

    /// Current grouping, ready to persist.
    pub fn save_request(&self) -> SaveRequest {
        SaveRequest {
            session: self.session_key.clone(),
            groups: collect_saved_groups(&self.doc),
        }
    }

    /// Restore saved groups once per page lifetime. A selection in progress is
    /// cleared when groups are built, since its ordinals no longer match.
    pub fn reconcile(&mut self, saved: &[SavedGroup]) -> OrganizerResult<ReconcileOutcome> {
        if self.session_key.is_none() {
            return Ok(ReconcileOutcome::Unpersisted);
        }
        let outcome = reconcile(&mut self.doc, saved)?;
        if matches!(outcome, ReconcileOutcome::Applied(_)) && self.session.is_selecting() {
            self.session.clear_selection();
            for turn in self.doc.turns() {
                self.doc.set_selected(&turn, false)?;
            }
        }
        Ok(outcome)
    }

    pub fn has_groups(&self) -> bool {
        !self.doc.group_containers().is_empty()
    }

    fn ensure_attached(&self, group: &D::Container) -> OrganizerResult<()> {
        if self.doc.group_containers().contains(group) {
            Ok(())
        } else {
            Err(OrganizerError::UnknownGroup)
        }
    }

    // ------------------------------------------------------------------
    // Organize mode
    // ------------------------------------------------------------------

    pub fn toggle_organize_mode(&mut self) -> OrganizerResult<Transition> {
        if self.session.is_selecting() {
            self.cancel_organize_mode()
        } else {
            Ok(self.session.enter())
        }
    }

    pub fn cancel_organize_mode(&mut self) -> OrganizerResult<Transition> {
        let transition = self.session.cancel();
        if transition == Transition::LeftSelecting {
            for turn in self.doc.turns() {
                self.doc.set_selected(&turn, false)?;
            }
        }
        Ok(transition)
    }

    /// A turn was clicked in organize mode. Returns the new selection size;
    /// clicks while idle or on grouped turns change nothing.
    pub fn click_turn(&mut self, turn: &D::Turn) -> OrganizerResult<usize> {
        if !self.session.is_selecting() {
            return Ok(0);
        }
        let eligible = OrdinalIndex::eligible(&self.doc);
        let Some(ordinal) = eligible.ordinal_of(turn) else {
            return Ok(self.session.selection().len());
        };
        let selection = self.session.click(ordinal).unwrap_or(&[]).to_vec();

        for (i, t) in eligible.turns().iter().enumerate() {
            self.doc.set_selected(t, selection.contains(&i))?;
        }
        Ok(selection.len())
    }

    // ------------------------------------------------------------------
    // Group mutations
    // ------------------------------------------------------------------

    /// Wrap the selected turns in a new group named `name`.
    pub fn create_group(&mut self, name: Option<&str>) -> OrganizerResult<Option<SaveRequest>> {
        let Some(name) = clean_name(name) else {
            log!("Organizer: group creation cancelled");
            return Ok(None);
        };

        let eligible = OrdinalIndex::eligible(&self.doc);
        let mut ordinals = self.session.selection().to_vec();
        ordinals.sort_unstable();
        let members: Vec<D::Turn> = ordinals
            .iter()
            .filter_map(|&i| eligible.get(i).cloned())
            .collect();
        let Some(anchor) = members.first() else {
            log!("Organizer: nothing selected to group");
            return Ok(None);
        };
        if !self.is_contiguous_run(&members) {
            log!("Organizer: selection spans an existing group; not grouping");
            return Ok(None);
        }

        let group = self.doc.create_group(&name, anchor)?;
        for turn in &members {
            self.doc.move_into_group(&group, turn)?;
        }
        self.cancel_organize_mode()?;
        Ok(Some(self.save_request()))
    }

    /// Groups persist as ordinals, so a new group must be one unbroken run of
    /// the full turn list; wrapping across another container would reorder turns.
    fn is_contiguous_run(&self, members: &[D::Turn]) -> bool {
        let full = OrdinalIndex::full(&self.doc);
        let positions: Option<Vec<usize>> = members.iter().map(|t| full.ordinal_of(t)).collect();
        match positions {
            Some(p) => p.windows(2).all(|w| w[1] == w[0] + 1),
            None => false,
        }
    }

    pub fn rename_group(
        &mut self,
        group: &D::Container,
        name: Option<&str>,
    ) -> OrganizerResult<Option<SaveRequest>> {
        self.ensure_attached(group)?;
        let Some(name) = clean_name(name) else {
            return Ok(None);
        };
        self.doc.set_group_name(group, &name)?;
        Ok(Some(self.save_request()))
    }

    /// Dissolve the grouping; member turns stay on the page in order.
    pub fn ungroup(&mut self, group: &D::Container) -> OrganizerResult<SaveRequest> {
        self.ensure_attached(group)?;
        self.doc.unwrap_group(group)?;
        Ok(self.save_request())
    }

    /// Remove the group and its turns from the organized view. Requires
    /// `confirmed`; the host page's own data is untouched.
    pub fn delete_group(
        &mut self,
        group: &D::Container,
        confirmed: bool,
    ) -> OrganizerResult<Option<SaveRequest>> {
        self.ensure_attached(group)?;
        if !confirmed {
            return Ok(None);
        }
        self.doc.remove_group(group)?;
        Ok(Some(self.save_request()))
    }

    /// Flip collapsed/expanded. Presentation only; returns the new collapsed flag.
    pub fn toggle_visibility(&mut self, group: &D::Container) -> OrganizerResult<bool> {
        self.ensure_attached(group)?;
        let collapsed = !self.doc.is_collapsed(group);
        self.doc.set_collapsed(group, collapsed)?;
        Ok(collapsed)
    }

    pub fn expand_all(&mut self) -> OrganizerResult<()> {
        self.set_all_collapsed(false)
    }

    pub fn collapse_all(&mut self) -> OrganizerResult<()> {
        self.set_all_collapsed(true)
    }

    fn set_all_collapsed(&mut self, collapsed: bool) -> OrganizerResult<()> {
        for group in self.doc.group_containers() {
            self.doc.set_collapsed(&group, collapsed)?;
        }
        Ok(())
    }

    /// Which session to wipe for Reset Organization. `Ok(None)` when the user
    /// declined; `Unpersisted` when there is no session to reset.
    pub fn reset_target(&self, confirmed: bool) -> OrganizerResult<Option<SessionKey>> {
        let key = self
            .session_key
            .clone()
            .ok_or(OrganizerError::Unpersisted)?;
        if !confirmed {
            return Ok(None);
        }
        Ok(Some(key))
    }
}
