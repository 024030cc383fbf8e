//! web-sys implementation of [`HostDocument`] plus the browser-only helpers
//! around it (mount-point wait, download, settle loop).

pub(crate) mod watch;

use crate::config::OrganizerConfig;
use crate::error::HostError;
use crate::export::Transcript;
use crate::host::HostDocument;
use crate::models::{Role, ScrollMetrics};
use crate::util::{retry_until, RetryPolicy, Sleeper};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, Node};

pub(crate) const WRAPPER_CLASS: &str = "organizer-group-wrapper";
const HEADER_CLASS: &str = "organizer-group-header";
const BODY_CLASS: &str = "organizer-group-body";
const TITLE_CLASS: &str = "organizer-title";
const ARROW_CLASS: &str = "organizer-arrow";
const ACTION_CLASS: &str = "organizer-group-action";
pub(crate) const SELECTED_CLASS: &str = "organizer-selected";

/// Marks clickable parts of a group header; the value names the command.
pub(crate) const ACTION_ATTR: &str = "data-organizer-action";
const COLLAPSED_ATTR: &str = "data-collapsed";
/// Set on deleted containers; they stay in the page, hidden, so their turns
/// keep counting toward persisted ordinals.
const REMOVED_ATTR: &str = "data-organizer-removed";

const ARROW_COLLAPSED: &str = "▶";
const ARROW_EXPANDED: &str = "▼";

const HEADER_ACTIONS: &[(&str, &str)] = &[
    ("rename", "Rename"),
    ("ungroup", "Ungroup"),
    ("download", "Download"),
    ("delete", "Delete"),
];

fn class_selector(class: &str) -> String {
    format!(".{class}")
}

fn query_all(root: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = root.query_selector_all(selector) else {
        return vec![];
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

fn set_display(el: &Element, value: &str) -> Result<(), HostError> {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        html.style().set_property("display", value)?;
    }
    Ok(())
}

/// The live page.
#[derive(Clone, Debug)]
pub struct DomDocument {
    document: Document,
    turn_selector: String,
    text_chunk_selector: String,
    user_role_selector: String,
}

impl DomDocument {
    pub fn new(document: Document, config: &OrganizerConfig) -> Self {
        Self {
            document,
            turn_selector: config.turn_selector.clone(),
            text_chunk_selector: config.text_chunk_selector.clone(),
            user_role_selector: config.user_role_selector.clone(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn document_all(&self, selector: &str) -> Vec<Element> {
        match self.document.document_element() {
            Some(root) => query_all(&root, selector),
            None => vec![],
        }
    }

    fn part(&self, group: &Element, class: &str) -> Result<Element, HostError> {
        group
            .query_selector(&class_selector(class))?
            .ok_or_else(|| HostError::new(format!("group container has no .{class}")))
    }

    fn create(&self, tag: &str, class: &str) -> Result<Element, HostError> {
        let el = self.document.create_element(tag)?;
        el.set_class_name(class);
        Ok(el)
    }

    /// The turn element an event target sits in, if any.
    pub fn turn_for_target(&self, target: &Element) -> Option<Element> {
        target.closest(&self.turn_selector).ok().flatten()
    }

    /// `(command, group container)` for a click inside a group header.
    pub fn header_action_for_target(&self, target: &Element) -> Option<(String, Element)> {
        let control = target
            .closest(&format!("[{ACTION_ATTR}]"))
            .ok()
            .flatten()?;
        let action = control.get_attribute(ACTION_ATTR)?;
        let group = control.closest(&class_selector(WRAPPER_CLASS)).ok().flatten()?;
        Some((action, group))
    }

    /// Cursor hint for organize mode.
    pub fn set_turn_cursor(&self, pointer: bool) {
        let value = if pointer { "pointer" } else { "" };
        for turn in self.turns() {
            if let Some(html) = turn.dyn_ref::<HtmlElement>() {
                let _ = html.style().set_property("cursor", value);
            }
        }
    }
}

impl HostDocument for DomDocument {
    type Turn = Element;
    type Container = Element;

    fn turns(&self) -> Vec<Element> {
        self.document_all(&self.turn_selector)
            .into_iter()
            .filter(|t| t.is_connected())
            .collect()
    }

    fn enclosing_group(&self, turn: &Element) -> Option<Element> {
        turn.closest(&class_selector(WRAPPER_CLASS)).ok().flatten()
    }

    fn group_containers(&self) -> Vec<Element> {
        self.document_all(&format!(".{WRAPPER_CLASS}:not([{REMOVED_ATTR}])"))
    }

    fn group_members(&self, group: &Element) -> Vec<Element> {
        match self.part(group, BODY_CLASS) {
            Ok(body) => query_all(&body, &self.turn_selector),
            Err(_) => vec![],
        }
    }

    fn group_name(&self, group: &Element) -> String {
        self.part(group, TITLE_CLASS)
            .ok()
            .and_then(|t| t.text_content())
            .unwrap_or_default()
    }

    fn is_collapsed(&self, group: &Element) -> bool {
        group.get_attribute(COLLAPSED_ATTR).as_deref() == Some("true")
    }

    fn turn_role(&self, turn: &Element) -> Role {
        let is_user = turn.matches(&self.user_role_selector).unwrap_or(false)
            || matches!(turn.query_selector(&self.user_role_selector), Ok(Some(_)));
        if is_user {
            Role::User
        } else {
            Role::Model
        }
    }

    fn turn_text(&self, turn: &Element) -> String {
        let chunks: Vec<String> = query_all(turn, &self.text_chunk_selector)
            .iter()
            .filter_map(|c| c.text_content())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !chunks.is_empty() {
            return chunks.join("\n");
        }
        turn.text_content()
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    }

    fn scroll_metrics(&self, group: &Element) -> ScrollMetrics {
        let Ok(body) = self.part(group, BODY_CLASS) else {
            return ScrollMetrics::default();
        };
        ScrollMetrics {
            top: body.scroll_top(),
            height: body.scroll_height(),
            client_height: body.client_height(),
        }
    }

    fn create_group(&mut self, name: &str, anchor: &Element) -> Result<Element, HostError> {
        let wrapper = self.create("div", WRAPPER_CLASS)?;
        wrapper.set_attribute(COLLAPSED_ATTR, "true")?;

        let header = self.create("div", HEADER_CLASS)?;
        header.set_attribute(ACTION_ATTR, "toggle")?;

        let arrow = self.create("span", ARROW_CLASS)?;
        arrow.set_text_content(Some(ARROW_COLLAPSED));
        let title = self.create("span", TITLE_CLASS)?;
        title.set_text_content(Some(name));
        header.append_child(&arrow)?;
        header.append_child(&title)?;

        for &(action, label) in HEADER_ACTIONS {
            let button = self.create("button", ACTION_CLASS)?;
            button.set_attribute(ACTION_ATTR, action)?;
            button.set_text_content(Some(label));
            header.append_child(&button)?;
        }

        let body = self.create("div", BODY_CLASS)?;
        set_display(&body, "none")?;
        if let Some(html) = body.dyn_ref::<HtmlElement>() {
            // Export scrolls this element to make the host render lazy turns.
            html.style().set_property("max-height", "70vh")?;
            html.style().set_property("overflow-y", "auto")?;
        }

        wrapper.append_child(&header)?;
        wrapper.append_child(&body)?;

        let parent = anchor
            .parent_node()
            .ok_or_else(|| HostError::new("anchor turn is not attached"))?;
        let before: &Node = anchor;
        parent.insert_before(&wrapper, Some(before))?;
        Ok(wrapper)
    }

    fn move_into_group(&mut self, group: &Element, turn: &Element) -> Result<(), HostError> {
        let body = self.part(group, BODY_CLASS)?;
        body.append_child(turn)?;
        Ok(())
    }

    fn unwrap_group(&mut self, group: &Element) -> Result<(), HostError> {
        let parent = group
            .parent_node()
            .ok_or_else(|| HostError::new("group container is not attached"))?;
        let before: &Node = group;
        for turn in self.group_members(group) {
            parent.insert_before(&turn, Some(before))?;
        }
        group.remove();
        Ok(())
    }

    fn remove_group(&mut self, group: &Element) -> Result<(), HostError> {
        group.set_attribute(REMOVED_ATTR, "true")?;
        set_display(group, "none")
    }

    fn set_group_name(&mut self, group: &Element, name: &str) -> Result<(), HostError> {
        self.part(group, TITLE_CLASS)?.set_text_content(Some(name));
        Ok(())
    }

    fn set_collapsed(&mut self, group: &Element, collapsed: bool) -> Result<(), HostError> {
        group.set_attribute(COLLAPSED_ATTR, if collapsed { "true" } else { "false" })?;
        set_display(
            &self.part(group, BODY_CLASS)?,
            if collapsed { "none" } else { "block" },
        )?;
        self.part(group, ARROW_CLASS)?.set_text_content(Some(if collapsed {
            ARROW_COLLAPSED
        } else {
            ARROW_EXPANDED
        }));
        Ok(())
    }

    fn set_scroll_top(&mut self, group: &Element, top: i32) -> Result<(), HostError> {
        self.part(group, BODY_CLASS)?.set_scroll_top(top);
        Ok(())
    }

    fn set_selected(&mut self, turn: &Element, selected: bool) -> Result<(), HostError> {
        turn.class_list()
            .toggle_with_force(SELECTED_CLASS, selected)?;
        Ok(())
    }
}

/// Poll for `selector` until it shows up or the budget runs out.
pub(crate) async fn wait_for_element<S: Sleeper + ?Sized>(
    document: &Document,
    selector: &str,
    policy: RetryPolicy,
    sleeper: &S,
) -> Option<Element> {
    let mut found = None;
    retry_until(policy, sleeper, |_| {
        found = document.query_selector(selector).ok().flatten();
        found.is_some()
    })
    .await;
    found
}

/// Hand the transcript to the browser as a file download.
pub(crate) fn download_transcript(document: &Document, transcript: &Transcript) -> Result<(), HostError> {
    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(&transcript.body));

    let options = web_sys::BlobPropertyBag::new();
    options.set_type("text/plain;charset=utf-8");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into()
        .map_err(|_| HostError::new("could not create download link"))?;
    anchor.set_href(&url);
    anchor.set_download(&transcript.file_name);
    anchor.click();

    // Revoking in the same task can cancel the download before it starts.
    let window = web_sys::window().ok_or_else(|| HostError::new("no window"))?;
    let revoke = Closure::once_into_js(move || {
        let _ = web_sys::Url::revoke_object_url(&url);
    });
    window.set_timeout_with_callback_and_timeout_and_arguments_0(revoke.unchecked_ref(), 0)?;
    Ok(())
}
