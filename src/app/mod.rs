//! Browser bootstrap: waits for the host toolbar, mounts the organizer
//! controls, restores saved groups once the chat list settles, and routes
//! clicks on turns and group headers to the controller.

use crate::config::OrganizerConfig;
use crate::dom::watch::watch_until_settled;
use crate::dom::{download_transcript, wait_for_element, DomDocument, WRAPPER_CLASS};
use crate::error::OrganizerError;
use crate::export::export_group;
use crate::host::HostDocument;
use crate::models::SaveRequest;
use crate::session::resolve_current;
use crate::state::{Organizer, Transition};
use crate::storage::{GroupStore, KeyValueStore, LocalStorageStore, MemoryStore};
use crate::sync::{ReconcileOutcome, SettleEvent};
use crate::util::TimeoutSleeper;
use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlElement};

const TOOLBAR_HOST_ID: &str = "organizer-toolbar";

type ClickListener = Closure<dyn FnMut(Event)>;

/// Everything one injected page needs, shared by the event handlers.
#[derive(Clone)]
struct OrganizerApp {
    organizer: Rc<RefCell<Organizer<DomDocument>>>,
    store: GroupStore,
    config: Rc<OrganizerConfig>,
    selecting: RwSignal<bool>,
    selected: RwSignal<usize>,
    /// Turn-click listener, present exactly while organize mode is on.
    turn_click: Rc<RefCell<Option<ClickListener>>>,
}

thread_local! {
    static APP: RefCell<Option<OrganizerApp>> = const { RefCell::new(None) };
}

fn with_app(f: impl FnOnce(&OrganizerApp)) {
    let app = APP.with(|a| a.borrow().clone());
    match app {
        Some(app) => f(&app),
        None => warn!("Organizer: command ignored; organizer is not attached"),
    }
}

fn event_target_element(ev: &Event) -> Option<Element> {
    ev.target().and_then(|t| t.dyn_into::<Element>().ok())
}

fn open_store(config: &OrganizerConfig) -> GroupStore {
    let backend: Rc<dyn KeyValueStore> = match LocalStorageStore::open() {
        Some(s) => Rc::new(s),
        None => {
            warn!("Organizer: localStorage unavailable; groups last until reload");
            Rc::new(MemoryStore::new())
        }
    };
    GroupStore::with_root_key(backend, config.storage_key.clone())
}

impl OrganizerApp {
    fn document(&self) -> web_sys::Document {
        self.organizer.borrow().doc().document().clone()
    }

    /// Fire-and-forget write of a mutation's result.
    fn persist(&self, request: SaveRequest) {
        let store = self.store.clone();
        spawn_local(async move {
            if let Err(e) = store.apply(request).await {
                error!("Organizer: failed to save groups: {e}");
            }
        });
    }

    fn persist_result(&self, result: Result<Option<SaveRequest>, OrganizerError>) {
        match result {
            Ok(Some(request)) => self.persist(request),
            Ok(None) => {}
            Err(e) => error!("Organizer: {e}"),
        }
    }

    /// Bring listeners and signals in line with the controller's mode.
    fn sync_mode(&self) {
        let (selecting, selected) = {
            let o = self.organizer.borrow();
            (o.is_selecting(), o.selection_len())
        };
        let listening = self.turn_click.borrow().is_some();
        if selecting && !listening {
            self.attach_turn_listener();
        } else if !selecting && listening {
            self.detach_turn_listener();
        }
        self.organizer.borrow().doc().set_turn_cursor(selecting);
        self.selecting.set(selecting);
        self.selected.set(selected);
    }

    fn attach_turn_listener(&self) {
        let listener: ClickListener = Closure::wrap(Box::new(move |ev: Event| {
            with_app(|app| app.on_turn_click(&ev));
        }) as Box<dyn FnMut(Event)>);
        let document = self.document();
        if let Err(e) = document.add_event_listener_with_callback_and_bool(
            "click",
            listener.as_ref().unchecked_ref(),
            true,
        ) {
            error!("Organizer: could not listen for turn clicks: {e:?}");
            return;
        }
        *self.turn_click.borrow_mut() = Some(listener);
    }

    fn detach_turn_listener(&self) {
        let Some(listener) = self.turn_click.borrow_mut().take() else {
            return;
        };
        let _ = self.document().remove_event_listener_with_callback_and_bool(
            "click",
            listener.as_ref().unchecked_ref(),
            true,
        );
    }

    fn on_turn_click(&self, ev: &Event) {
        let Some(target) = event_target_element(ev) else {
            return;
        };
        let turn = self.organizer.borrow().doc().turn_for_target(&target);
        let Some(turn) = turn else {
            return;
        };
        if target.closest(&format!(".{WRAPPER_CLASS}")).ok().flatten().is_some() {
            return;
        }
        ev.stop_propagation();
        ev.prevent_default();

        let result = self.organizer.borrow_mut().click_turn(&turn);
        match result {
            Ok(n) => self.selected.set(n),
            Err(e) => error!("Organizer: {e}"),
        }
    }

    // ------------------------------------------------------------------
    // Toolbar commands
    // ------------------------------------------------------------------

    fn toggle_organize(&self) {
        let result = self.organizer.borrow_mut().toggle_organize_mode();
        match result {
            Ok(Transition::EnteredSelecting) => log!("Organizer: organize mode on"),
            Ok(Transition::LeftSelecting) => log!("Organizer: organize mode off"),
            Ok(Transition::Unchanged) => {}
            Err(e) => error!("Organizer: {e}"),
        }
        self.sync_mode();
    }

    fn group_selected(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let name = window
            .prompt_with_message_and_default(
                "Enter a name for this group:",
                &self.config.default_group_name,
            )
            .ok()
            .flatten();
        let result = self.organizer.borrow_mut().create_group(name.as_deref());
        self.persist_result(result);
        self.sync_mode();
    }

    fn expand_all(&self) {
        if let Err(e) = self.organizer.borrow_mut().expand_all() {
            error!("Organizer: {e}");
        }
    }

    fn collapse_all(&self) {
        if let Err(e) = self.organizer.borrow_mut().collapse_all() {
            error!("Organizer: {e}");
        }
    }

    fn reset_organization(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if self.organizer.borrow().session_key().is_none() {
            let _ = window.alert_with_message(&OrganizerError::Unpersisted.to_string());
            return;
        }
        let confirmed = window
            .confirm_with_message("Remove all groups for this conversation and reload?")
            .unwrap_or(false);

        let target = self.organizer.borrow().reset_target(confirmed);
        let key = match target {
            Ok(Some(key)) => key,
            Ok(None) => return,
            Err(e) => {
                let _ = window.alert_with_message(&e.to_string());
                return;
            }
        };

        let store = self.store.clone();
        spawn_local(async move {
            if let Err(e) = store.reset(&key).await {
                error!("Organizer: failed to reset groups for {key}: {e}");
                return;
            }
            if let Err(e) = window.location().reload() {
                error!("Organizer: reload failed: {e:?}");
            }
        });
    }

    // ------------------------------------------------------------------
    // Group header commands
    // ------------------------------------------------------------------

    fn on_header_click(&self, ev: &Event) {
        let Some(target) = event_target_element(ev) else {
            return;
        };
        let action = self.organizer.borrow().doc().header_action_for_target(&target);
        let Some((action, group)) = action else {
            return;
        };
        ev.stop_propagation();

        match action.as_str() {
            "toggle" => {
                let result = self.organizer.borrow_mut().toggle_visibility(&group);
                if let Err(e) = result {
                    error!("Organizer: {e}");
                }
            }
            "rename" => self.rename(&group),
            "ungroup" => {
                let result = self.organizer.borrow_mut().ungroup(&group);
                self.persist_result(result.map(Some));
            }
            "delete" => self.delete(&group),
            "download" => self.download(group),
            other => warn!("Organizer: unknown group action {other:?}"),
        }
    }

    fn rename(&self, group: &Element) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let current = self.organizer.borrow().doc().group_name(group);
        let name = window
            .prompt_with_message_and_default("Rename group:", &current)
            .ok()
            .flatten();
        let result = self.organizer.borrow_mut().rename_group(group, name.as_deref());
        self.persist_result(result);
    }

    fn delete(&self, group: &Element) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let name = self.organizer.borrow().doc().group_name(group);
        let confirmed = window
            .confirm_with_message(&format!(
                "Delete group \"{name}\" and hide its chats from this view?"
            ))
            .unwrap_or(false);
        let result = self.organizer.borrow_mut().delete_group(group, confirmed);
        self.persist_result(result);
    }

    fn download(&self, group: Element) {
        let mut doc = self.organizer.borrow().doc().clone();
        let export = self.config.export();
        spawn_local(async move {
            match export_group(&mut doc, &group, &TimeoutSleeper, &export).await {
                Ok((transcript, report)) => {
                    log!(
                        "Organizer: exported {}/{} populated turns to {}",
                        report.populated,
                        report.total,
                        transcript.file_name
                    );
                    if let Err(e) = download_transcript(doc.document(), &transcript) {
                        error!("Organizer: download failed: {e}");
                    }
                }
                Err(e) => error!("Organizer: {e}"),
            }
        });
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    fn reconcile_from_store(&self) {
        let Some(key) = self.organizer.borrow().session_key().cloned() else {
            log!("Organizer: conversation not saved yet; nothing to restore");
            return;
        };
        let app = self.clone();
        spawn_local(async move {
            let saved = match app.store.load(&key).await {
                Ok(saved) => saved,
                Err(e) => {
                    error!("Organizer: could not load saved groups: {e}");
                    return;
                }
            };
            if saved.is_empty() {
                return;
            }
            let outcome = app.organizer.borrow_mut().reconcile(&saved);
            match outcome {
                Ok(ReconcileOutcome::Applied(report)) => {
                    log!(
                        "Organizer: restored {} group(s), dropped {}",
                        report.built.len(),
                        report.dropped_groups.len()
                    );
                    app.sync_mode();
                }
                Ok(ReconcileOutcome::AlreadyApplied | ReconcileOutcome::Unpersisted) => {}
                Err(e) => error!("Organizer: restoring groups failed: {e}"),
            }
        });
    }
}

#[component]
fn OrganizerToolbar(selecting: RwSignal<bool>, selected: RwSignal<usize>) -> impl IntoView {
    view! {
        <span class="organizer-toolbar-buttons">
            <button
                id="organizer-toggle-btn"
                class="organizer-btn"
                class:organizer-btn-cancel=move || selecting.get()
                on:click=move |_| with_app(OrganizerApp::toggle_organize)
            >
                {move || if selecting.get() { "Cancel Organizing" } else { "Organize Chats" }}
            </button>
            <button
                id="organizer-group-btn"
                class="organizer-btn"
                style:display=move || {
                    if selecting.get() && selected.get() > 0 { "inline-block" } else { "none" }
                }
                on:click=move |_| with_app(OrganizerApp::group_selected)
            >
                {move || format!("Group {} Chat(s)", selected.get())}
            </button>
            <button class="organizer-btn" on:click=move |_| with_app(OrganizerApp::expand_all)>
                "Expand All"
            </button>
            <button class="organizer-btn" on:click=move |_| with_app(OrganizerApp::collapse_all)>
                "Collapse All"
            </button>
            <button
                class="organizer-btn"
                on:click=move |_| with_app(OrganizerApp::reset_organization)
            >
                "Reset Organization"
            </button>
        </span>
    }
}

fn install_header_listener(document: &web_sys::Document) {
    let listener: ClickListener = Closure::wrap(Box::new(move |ev: Event| {
        with_app(|app| app.on_header_click(&ev));
    }) as Box<dyn FnMut(Event)>);
    if let Err(e) =
        document.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())
    {
        error!("Organizer: could not listen for group header clicks: {e:?}");
    }
    // Page-lifetime listener.
    listener.forget();
}

fn start_settle_watch(app: &OrganizerApp, document: &web_sys::Document) {
    // Attach-time pass covers pages that are already fully rendered.
    app.reconcile_from_store();

    let target = document
        .query_selector(&app.config.chat_container_selector)
        .ok()
        .flatten();
    let Some(target) = target else {
        warn!(
            "Organizer: chat container {:?} not found; not watching for late turns",
            app.config.chat_container_selector
        );
        return;
    };

    let result = watch_until_settled(&target, app.config.settle(), move |event| {
        match event {
            SettleEvent::Settled { waited_ms } => {
                log!("Organizer: chat list settled after {waited_ms} ms")
            }
            SettleEvent::GaveUp { waited_ms } => warn!(
                "Organizer: chat list still changing after {waited_ms} ms; restoring anyway"
            ),
        }
        with_app(OrganizerApp::reconcile_from_store);
    });
    if let Err(e) = result {
        error!("Organizer: could not observe chat container: {e}");
    }
}

/// Entry point: find the toolbar, mount the controls and restore groups.
pub fn start() {
    let config = Rc::new(OrganizerConfig::from_window());
    // Tasks are spawned before anything is mounted.
    #[cfg(target_arch = "wasm32")]
    let _ = leptos::task::Executor::init_wasm_bindgen();
    spawn_local(async move {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let toolbar = wait_for_element(
            &document,
            &config.toolbar_selector,
            config.mount_wait(),
            &TimeoutSleeper,
        )
        .await;
        let Some(toolbar) = toolbar else {
            error!(
                "Organizer: Could not find the target element to inject UI. Selector used: {}",
                config.toolbar_selector
            );
            return;
        };
        if document.get_element_by_id(TOOLBAR_HOST_ID).is_some() {
            return;
        }

        let session_key = resolve_current();
        let app = OrganizerApp {
            organizer: Rc::new(RefCell::new(Organizer::new(
                DomDocument::new(document.clone(), &config),
                session_key,
            ))),
            store: open_store(&config),
            config: config.clone(),
            selecting: RwSignal::new(false),
            selected: RwSignal::new(0),
            turn_click: Rc::new(RefCell::new(None)),
        };
        APP.with(|a| *a.borrow_mut() = Some(app.clone()));

        let Ok(host) = document.create_element("span") else {
            return;
        };
        host.set_id(TOOLBAR_HOST_ID);
        if let Err(e) = toolbar.append_child(&host) {
            error!("Organizer: could not attach toolbar: {e:?}");
            return;
        }
        let Ok(host) = host.dyn_into::<HtmlElement>() else {
            return;
        };
        let (selecting, selected) = (app.selecting, app.selected);
        leptos::mount::mount_to(host, move || {
            view! { <OrganizerToolbar selecting=selecting selected=selected /> }
        })
        .forget();

        install_header_listener(&document);
        start_settle_watch(&app, &document);
    });
}
