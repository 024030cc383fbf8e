//! Plain-text export of one group.
//!
//! The host virtualizes long turns, so a group's members may be empty shells
//! until they are scrolled into view. Export first scrolls the group body until
//! its height stops growing (or it reaches the end), then polls until most
//! members carry text, and serializes whatever is there once either budget
//! runs out.

use crate::error::{ExportError, HostError};
use crate::host::HostDocument;
use crate::util::{retry_until, RetryOutcome, RetryPolicy, Sleeper};
use leptos::logging::warn;

pub(crate) const TURN_DELIMITER: &str = "----------------------------------------";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportConfig {
    pub scroll_step_px: i32,
    pub poll: RetryPolicy,
    /// Fraction of members that must have text before serializing.
    pub readiness_threshold: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scroll_step_px: 800,
            poll: RetryPolicy {
                interval_ms: 250,
                max_attempts: 40,
            },
            readiness_threshold: 0.8,
        }
    }
}

/// The downloadable artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    pub file_name: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportReport {
    pub scroll: RetryOutcome,
    pub readiness: RetryOutcome,
    pub populated: usize,
    pub total: usize,
}

pub(crate) fn transcript_file_name(group_name: &str) -> String {
    let stem: String = group_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "group.txt".to_string()
    } else {
        format!("{stem}.txt")
    }
}

fn populated_count<D: HostDocument>(doc: &D, members: &[D::Turn]) -> usize {
    members
        .iter()
        .filter(|t| !doc.turn_text(t).is_empty())
        .count()
}

fn populated_fraction(populated: usize, total: usize) -> f32 {
    if total == 0 {
        1.0
    } else {
        populated as f32 / total as f32
    }
}

/// Phase 1: advance the scroll position until the content height settles.
async fn scroll_to_materialize<D, S>(
    doc: &mut D,
    group: &D::Container,
    sleeper: &S,
    config: &ExportConfig,
) -> Result<RetryOutcome, HostError>
where
    D: HostDocument,
    S: Sleeper + ?Sized,
{
    let mut last_height: Option<i32> = None;
    let mut failure: Option<HostError> = None;

    let outcome = retry_until(config.poll, sleeper, |_| {
        let m = doc.scroll_metrics(group);
        if m.at_end() || last_height == Some(m.height) {
            return true;
        }
        last_height = Some(m.height);
        if let Err(e) = doc.set_scroll_top(group, m.top + config.scroll_step_px) {
            failure = Some(e);
            return true;
        }
        false
    })
    .await;

    match failure {
        Some(e) => Err(e),
        None => Ok(outcome),
    }
}

/// Serialize `members` as a transcript headed by `group_name`.
pub fn render_transcript<D: HostDocument>(
    doc: &D,
    group_name: &str,
    members: &[D::Turn],
) -> Transcript {
    let mut body = format!("Group: {group_name}\n\n");
    for turn in members {
        let role = doc.turn_role(turn);
        let text = doc.turn_text(turn);
        body.push_str(&format!(
            "{} {}:\n{}\n\n{}\n\n",
            role.icon(),
            role,
            text,
            TURN_DELIMITER
        ));
    }
    Transcript {
        file_name: transcript_file_name(group_name),
        body,
    }
}

/// Materialize and serialize one group.
///
/// A collapsed group is expanded for the duration of the export and collapsed
/// again afterwards, also when a phase fails.
pub async fn export_group<D, S>(
    doc: &mut D,
    group: &D::Container,
    sleeper: &S,
    config: &ExportConfig,
) -> Result<(Transcript, ExportReport), ExportError>
where
    D: HostDocument,
    S: Sleeper + ?Sized,
{
    let was_collapsed = doc.is_collapsed(group);
    if was_collapsed {
        doc.set_collapsed(group, false)?;
    }

    let result = materialize_and_render(doc, group, sleeper, config).await;

    if was_collapsed {
        if let Err(e) = doc.set_collapsed(group, true) {
            warn!("Organizer: could not collapse group again after export: {e}");
        }
    }
    result
}

async fn materialize_and_render<D, S>(
    doc: &mut D,
    group: &D::Container,
    sleeper: &S,
    config: &ExportConfig,
) -> Result<(Transcript, ExportReport), ExportError>
where
    D: HostDocument,
    S: Sleeper + ?Sized,
{
    let scroll = scroll_to_materialize(doc, group, sleeper, config).await?;
    if !scroll.is_satisfied() {
        warn!(
            "Organizer: group content still growing after {} scroll steps; exporting what is rendered",
            scroll.attempts()
        );
    }

    let doc_ref: &D = doc;
    let members = doc_ref.group_members(group);
    let total = members.len();
    let readiness = retry_until(config.poll, sleeper, |_| {
        populated_fraction(populated_count(doc_ref, &members), total) >= config.readiness_threshold
    })
    .await;

    let populated = populated_count(doc_ref, &members);
    if !readiness.is_satisfied() {
        warn!(
            "Organizer: only {populated}/{total} turns have text after {} polls; exporting partial transcript",
            readiness.attempts()
        );
    }

    let transcript = render_transcript(doc_ref, &doc_ref.group_name(group), &members);
    Ok((
        transcript,
        ExportReport {
            scroll,
            readiness,
            populated,
            total,
        },
    ))
}
