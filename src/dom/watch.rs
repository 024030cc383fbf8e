//! Browser driver for [`SettleWatcher`]: a `MutationObserver` feeds structural
//! changes in, a single `setTimeout` is cleared and re-armed on each one.

use crate::error::HostError;
use crate::sync::{SettleConfig, SettleEvent, SettleWatcher};
use crate::util::now_ms;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Element, MutationObserver, MutationObserverInit};

struct SettleLoop {
    watcher: SettleWatcher,
    timer_id: Option<i32>,
    observer: Option<MutationObserver>,
    on_event: Option<Box<dyn FnOnce(SettleEvent)>>,
}

/// Observe `target` until the host stops changing it, then call `on_event` once
/// and disconnect.
pub(crate) fn watch_until_settled(
    target: &Element,
    config: SettleConfig,
    on_event: impl FnOnce(SettleEvent) + 'static,
) -> Result<(), HostError> {
    let state = Rc::new(RefCell::new(SettleLoop {
        watcher: SettleWatcher::attach(config, now_ms()),
        timer_id: None,
        observer: None,
        on_event: Some(Box::new(on_event)),
    }));

    let s2 = state.clone();
    let cb = Closure::wrap(Box::new(move |_records: js_sys::Array, _obs: MutationObserver| {
        let changed = s2
            .borrow_mut()
            .watcher
            .on_structural_change(now_ms())
            .is_some();
        if changed {
            arm_timer(&s2);
        }
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let observer = MutationObserver::new(cb.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer.observe_with_options(target, &init)?;

    // Lives until the page goes away; the observer is disconnected once settled.
    cb.forget();

    state.borrow_mut().observer = Some(observer);
    arm_timer(&state);
    Ok(())
}

fn arm_timer(state: &Rc<RefCell<SettleLoop>>) {
    let Some(win) = web_sys::window() else {
        return;
    };

    let mut s = state.borrow_mut();
    if let Some(tid) = s.timer_id.take() {
        win.clear_timeout_with_handle(tid);
    }
    let Some(deadline) = s.watcher.next_deadline() else {
        return;
    };
    let delay = (deadline - now_ms()).clamp(0, i64::from(i32::MAX)) as i32;

    let s2 = state.clone();
    let cb = Closure::once_into_js(move || {
        on_timer(&s2);
    });
    let tid = win
        .set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), delay)
        .unwrap_or(0);
    s.timer_id = Some(tid);
}

fn on_timer(state: &Rc<RefCell<SettleLoop>>) {
    let event = {
        let mut s = state.borrow_mut();
        s.timer_id = None;
        s.watcher.on_timer(now_ms())
    };

    let Some(event) = event else {
        // Timers can fire a tick early; wait for the real deadline.
        arm_timer(state);
        return;
    };

    let (observer, on_event) = {
        let mut s = state.borrow_mut();
        (s.observer.take(), s.on_event.take())
    };
    if let Some(observer) = observer {
        observer.disconnect();
    }
    if let Some(on_event) = on_event {
        on_event(event);
    }
}
