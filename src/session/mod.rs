use crate::models::SessionKey;

const PROMPTS_SEGMENT: &str = "prompts";

/// Path segments that address an unsaved draft rather than a stored conversation.
const DRAFT_SEGMENTS: &[&str] = &["new_chat"];

/// Derive the session key from a location path such as `/prompts/<id>`.
///
/// Returns `None` for unsaved drafts and for paths without a `prompts` segment;
/// persistence is disabled for such pages.
pub fn resolve_session_key(pathname: &str) -> Option<SessionKey> {
    let mut segments = pathname.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == PROMPTS_SEGMENT)?;

    let raw = segments.next()?;
    let id = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let id = id.trim();

    if id.is_empty() || DRAFT_SEGMENTS.contains(&id) {
        return None;
    }
    Some(SessionKey(id.to_string()))
}

/// Resolve against the live `window.location`.
pub fn resolve_current() -> Option<SessionKey> {
    let pathname = web_sys::window()?.location().pathname().ok()?;
    resolve_session_key(&pathname)
}
