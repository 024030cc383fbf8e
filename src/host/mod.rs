use crate::error::HostError;
use crate::models::{Role, ScrollMetrics};

#[cfg(test)]
pub(crate) mod memory;

/// The page the organizer decorates.
///
/// Turns and group containers are opaque handles owned by the host. Reads never
/// fail (a missing element reads as empty); writes surface DOM exceptions.
///
/// Grouping is presentation only: `turns()` returns every attached turn in
/// document order whether or not it sits inside a container, including the
/// hidden members of a removed container. Persisted ordinals count those too,
/// since the host renders them again on reload.
pub trait HostDocument {
    type Turn: Clone + PartialEq + std::fmt::Debug;
    type Container: Clone + PartialEq + std::fmt::Debug;

    fn turns(&self) -> Vec<Self::Turn>;
    /// Container holding `turn`, removed containers included.
    fn enclosing_group(&self, turn: &Self::Turn) -> Option<Self::Container>;
    /// Live containers in document order; removed ones are left out.
    fn group_containers(&self) -> Vec<Self::Container>;
    fn group_members(&self, group: &Self::Container) -> Vec<Self::Turn>;
    fn group_name(&self, group: &Self::Container) -> String;
    fn is_collapsed(&self, group: &Self::Container) -> bool;

    fn turn_role(&self, turn: &Self::Turn) -> Role;
    /// Text of a turn, preferring its structured chunks when it has any.
    fn turn_text(&self, turn: &Self::Turn) -> String;
    fn scroll_metrics(&self, group: &Self::Container) -> ScrollMetrics;

    /// Insert an empty, collapsed container immediately before `anchor`.
    fn create_group(&mut self, name: &str, anchor: &Self::Turn)
        -> Result<Self::Container, HostError>;
    /// Append `turn` to the end of `group`.
    fn move_into_group(&mut self, group: &Self::Container, turn: &Self::Turn)
        -> Result<(), HostError>;
    /// Put the members back where the container sits, in order, and drop the container.
    fn unwrap_group(&mut self, group: &Self::Container) -> Result<(), HostError>;
    /// Hide the container together with its members. The members keep their
    /// place in `turns()`.
    fn remove_group(&mut self, group: &Self::Container) -> Result<(), HostError>;
    fn set_group_name(&mut self, group: &Self::Container, name: &str) -> Result<(), HostError>;
    fn set_collapsed(&mut self, group: &Self::Container, collapsed: bool)
        -> Result<(), HostError>;
    fn set_scroll_top(&mut self, group: &Self::Container, top: i32) -> Result<(), HostError>;
    fn set_selected(&mut self, turn: &Self::Turn, selected: bool) -> Result<(), HostError>;
}
