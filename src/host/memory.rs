//! In-memory host page used by the test suite.
//!
//! Models a flat turn list where group containers sit inline (removed ones stay
//! in place, hidden), plus enough of a scroll model to exercise lazy
//! materialisation during export: a lazy turn only gets its text once the
//! group has been scrolled far enough to show it.

use super::HostDocument;
use crate::error::HostError;
use crate::models::{Role, ScrollMetrics};

pub(crate) const ROW_HEIGHT: i32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TurnId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GroupId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Turn(TurnId),
    Group(GroupId),
}

#[derive(Clone, Debug)]
struct MemTurn {
    role: Role,
    chunks: Vec<String>,
    text: String,
    lazy_text: Option<String>,
    selected: bool,
}

#[derive(Clone, Debug)]
struct MemGroup {
    name: String,
    members: Vec<TurnId>,
    collapsed: bool,
    scroll_top: i32,
    removed: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryDocument {
    slots: Vec<Slot>,
    turns: Vec<MemTurn>,
    groups: Vec<Option<MemGroup>>,
    pub fail_writes: bool,
    /// Fail only attempts to collapse a group.
    pub fail_collapse: bool,
}

impl MemoryDocument {
    /// `n` alternating user/model turns with texts `turn 0`, `turn 1`, ...
    pub fn with_turns(n: usize) -> Self {
        let mut doc = Self::default();
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Model };
            doc.push_turn(role, &format!("turn {i}"));
        }
        doc
    }

    pub fn push_turn(&mut self, role: Role, text: &str) -> TurnId {
        self.push(MemTurn {
            role,
            chunks: vec![],
            text: text.to_string(),
            lazy_text: None,
            selected: false,
        })
    }

    pub fn push_chunked_turn(&mut self, role: Role, chunks: &[&str]) -> TurnId {
        self.push(MemTurn {
            role,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            text: chunks.concat(),
            lazy_text: None,
            selected: false,
        })
    }

    /// A turn whose text only appears once it is scrolled into view.
    pub fn push_lazy_turn(&mut self, role: Role, text: &str) -> TurnId {
        self.push(MemTurn {
            role,
            chunks: vec![],
            text: String::new(),
            lazy_text: Some(text.to_string()),
            selected: false,
        })
    }

    fn push(&mut self, turn: MemTurn) -> TurnId {
        let id = TurnId(self.turns.len());
        self.turns.push(turn);
        self.slots.push(Slot::Turn(id));
        id
    }

    /// Simulates the host page re-rendering from scratch: every container is
    /// gone and the surviving turns are flat again.
    pub fn rerender(&self) -> Self {
        let mut doc = Self::default();
        for id in self.turns() {
            let mut t = self.turns[id.0].clone();
            t.selected = false;
            doc.push(t);
        }
        doc
    }

    /// Keep only the first `keep` turns, as if the host rendered a shorter list.
    pub fn truncate_turns(&mut self, keep: usize) {
        let kept: Vec<TurnId> = self.turns().into_iter().take(keep).collect();
        self.slots.retain(|s| match s {
            Slot::Turn(t) => kept.contains(t),
            Slot::Group(_) => true,
        });
    }

    pub fn is_selected(&self, turn: TurnId) -> bool {
        self.turns[turn.0].selected
    }

    pub fn text_of(&self, turn: TurnId) -> &str {
        &self.turns[turn.0].text
    }

    fn group(&self, id: GroupId) -> Result<&MemGroup, HostError> {
        self.groups
            .get(id.0)
            .and_then(|g| g.as_ref())
            .ok_or_else(|| HostError::new(format!("group {} is detached", id.0)))
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut MemGroup, HostError> {
        self.groups
            .get_mut(id.0)
            .and_then(|g| g.as_mut())
            .ok_or_else(|| HostError::new(format!("group {} is detached", id.0)))
    }

    fn check_writable(&self) -> Result<(), HostError> {
        if self.fail_writes {
            return Err(HostError::new("NotAllowedError"));
        }
        Ok(())
    }

    fn detach_turn(&mut self, turn: TurnId) {
        self.slots.retain(|s| *s != Slot::Turn(turn));
        for g in self.groups.iter_mut().flatten() {
            g.members.retain(|m| *m != turn);
        }
    }

    fn materialize_visible(&mut self, group: GroupId) {
        let Some(g) = self.groups.get(group.0).and_then(|g| g.as_ref()) else {
            return;
        };
        let visible_bottom = g.scroll_top + ROW_HEIGHT;
        let members = g.members.clone();
        for (pos, id) in members.into_iter().enumerate() {
            if pos as i32 * ROW_HEIGHT <= visible_bottom {
                let t = &mut self.turns[id.0];
                if let Some(text) = t.lazy_text.take() {
                    t.text = text;
                }
            }
        }
    }
}

impl HostDocument for MemoryDocument {
    type Turn = TurnId;
    type Container = GroupId;

    fn turns(&self) -> Vec<TurnId> {
        let mut out = Vec::new();
        for slot in &self.slots {
            match slot {
                Slot::Turn(t) => out.push(*t),
                Slot::Group(g) => {
                    if let Ok(g) = self.group(*g) {
                        out.extend(g.members.iter().copied());
                    }
                }
            }
        }
        out
    }

    fn enclosing_group(&self, turn: &TurnId) -> Option<GroupId> {
        self.slots.iter().find_map(|s| match s {
            Slot::Group(g) if self.group_members(g).contains(turn) => Some(*g),
            _ => None,
        })
    }

    fn group_containers(&self) -> Vec<GroupId> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                Slot::Group(g) if self.group(*g).is_ok_and(|g| !g.removed) => Some(*g),
                _ => None,
            })
            .collect()
    }

    fn group_members(&self, group: &GroupId) -> Vec<TurnId> {
        self.group(*group)
            .map(|g| g.members.clone())
            .unwrap_or_default()
    }

    fn group_name(&self, group: &GroupId) -> String {
        self.group(*group).map(|g| g.name.clone()).unwrap_or_default()
    }

    fn is_collapsed(&self, group: &GroupId) -> bool {
        self.group(*group).map(|g| g.collapsed).unwrap_or(false)
    }

    fn turn_role(&self, turn: &TurnId) -> Role {
        self.turns[turn.0].role
    }

    fn turn_text(&self, turn: &TurnId) -> String {
        let t = &self.turns[turn.0];
        if t.chunks.is_empty() {
            t.text.trim().to_string()
        } else {
            t.chunks
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    fn scroll_metrics(&self, group: &GroupId) -> ScrollMetrics {
        let Ok(g) = self.group(*group) else {
            return ScrollMetrics::default();
        };
        let rendered = g
            .members
            .iter()
            .filter(|id| self.turns[id.0].lazy_text.is_none())
            .count() as i32;
        let placeholder = if rendered < g.members.len() as i32 {
            2 * ROW_HEIGHT
        } else {
            0
        };
        ScrollMetrics {
            top: g.scroll_top,
            height: rendered * ROW_HEIGHT + placeholder,
            client_height: ROW_HEIGHT,
        }
    }

    fn create_group(&mut self, name: &str, anchor: &TurnId) -> Result<GroupId, HostError> {
        self.check_writable()?;
        let pos = self
            .slots
            .iter()
            .position(|s| *s == Slot::Turn(*anchor))
            .ok_or_else(|| HostError::new("anchor turn is not a top-level turn"))?;
        let id = GroupId(self.groups.len());
        self.groups.push(Some(MemGroup {
            name: name.to_string(),
            members: vec![],
            collapsed: true,
            scroll_top: 0,
            removed: false,
        }));
        self.slots.insert(pos, Slot::Group(id));
        Ok(id)
    }

    fn move_into_group(&mut self, group: &GroupId, turn: &TurnId) -> Result<(), HostError> {
        self.check_writable()?;
        self.group(*group)?;
        self.detach_turn(*turn);
        self.group_mut(*group)?.members.push(*turn);
        Ok(())
    }

    fn unwrap_group(&mut self, group: &GroupId) -> Result<(), HostError> {
        self.check_writable()?;
        let members = self.group(*group)?.members.clone();
        let pos = self
            .slots
            .iter()
            .position(|s| *s == Slot::Group(*group))
            .ok_or_else(|| HostError::new("group is not attached"))?;
        self.slots.remove(pos);
        for (offset, m) in members.into_iter().enumerate() {
            self.slots.insert(pos + offset, Slot::Turn(m));
        }
        self.groups[group.0] = None;
        Ok(())
    }

    fn remove_group(&mut self, group: &GroupId) -> Result<(), HostError> {
        self.check_writable()?;
        self.group_mut(*group)?.removed = true;
        Ok(())
    }

    fn set_group_name(&mut self, group: &GroupId, name: &str) -> Result<(), HostError> {
        self.check_writable()?;
        self.group_mut(*group)?.name = name.to_string();
        Ok(())
    }

    fn set_collapsed(&mut self, group: &GroupId, collapsed: bool) -> Result<(), HostError> {
        self.check_writable()?;
        if collapsed && self.fail_collapse {
            return Err(HostError::new("NotAllowedError"));
        }
        self.group_mut(*group)?.collapsed = collapsed;
        Ok(())
    }

    fn set_scroll_top(&mut self, group: &GroupId, top: i32) -> Result<(), HostError> {
        let height = self.scroll_metrics(group).height;
        let g = self.group_mut(*group)?;
        g.scroll_top = top.clamp(0, (height - ROW_HEIGHT).max(0));
        self.materialize_visible(*group);
        Ok(())
    }

    fn set_selected(&mut self, turn: &TurnId, selected: bool) -> Result<(), HostError> {
        self.check_writable()?;
        self.turns[turn.0].selected = selected;
        Ok(())
    }
}
