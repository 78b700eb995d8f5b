/// New-tab countdown page

use std::cell::Cell;
use std::rc::Rc;

use chrono::{Local, NaiveDateTime};
use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::VisibilityState;
use yew::prelude::*;

use crate::countdown::{calculate, calculate_daily, RemainingTime};
use crate::settings::{TimerKind, TimerSettings};
use crate::storage::{load_or_default, SettingsBackend};
use crate::ui::components::{ProgressBar, TimeUnit};

const VISIBLE_TICK_MS: i32 = 1_000;
const HIDDEN_TICK_MS: i32 = 60_000;

#[function_component(CountdownPage)]
pub fn countdown_page() -> Html {
    let store = use_state(SettingsBackend::detect);
    let settings = use_state(|| None::<TimerSettings>);
    let now = use_state(local_now);

    // Load settings on mount
    {
        let store = store.clone();
        let settings = settings.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                settings.set(Some(load_or_default(&*store).await));
            });
            || ()
        });
    }

    // Display refresh loop
    {
        let now = now.clone();
        use_effect_with((), move |_| {
            let ticker = Ticker::start(move || now.set(local_now()));
            move || drop(ticker)
        });
    }

    let Some(settings) = (*settings).clone() else {
        return html! {
            <div class="countdown-page">
                <Spinner />
            </div>
        };
    };

    let (remaining, warning) = match calculate(&settings, *now) {
        Ok(remaining) => (remaining, None),
        Err(e) => {
            log::warn!("Falling back to daily countdown: {}", e);
            (calculate_daily(*now), Some(e.reason().to_string()))
        }
    };
    let kind = if warning.is_some() {
        TimerKind::Daily
    } else {
        settings.timer_kind
    };

    html! {
        <div class="countdown-page">
            if !settings.setup_completed {
                <Alert r#type={AlertType::Info} title={"Open the extension popup to choose your countdown"} inline={true}>
                </Alert>
            }

            if let Some(warning) = warning {
                <Alert r#type={AlertType::Warning} title={"Check your countdown settings"} inline={true}>
                    {warning}
                </Alert>
            }

            <h1 class="countdown-title">{title(kind)}</h1>

            if let Some(message) = &remaining.message {
                <p class="countdown-message">{message.clone()}</p>
            }

            {render_units(kind, &remaining)}

            <ProgressBar percentage={remaining.progress_percentage} label={progress_label(kind).to_string()} />
        </div>
    }
}

fn render_units(kind: TimerKind, remaining: &RemainingTime) -> Html {
    html! {
        <div class="time-units">
            { for visible_units(kind, remaining).into_iter().map(|(value, label)| html! {
                <TimeUnit value={value} label={label} />
            }) }
        </div>
    }
}

/// The (value, label) cells shown for a countdown, largest unit first
///
/// Years appear for a birthday countdown only when the next birthday is a
/// full calendar year away, e.g. on the birthday itself at midnight.
fn visible_units(kind: TimerKind, remaining: &RemainingTime) -> Vec<(u32, &'static str)> {
    if remaining.is_complete {
        return Vec::new();
    }

    let clock = [
        (remaining.hours, "hours"),
        (remaining.minutes, "minutes"),
        (remaining.seconds, "seconds"),
    ];

    let mut units = Vec::with_capacity(6);
    if kind != TimerKind::Daily {
        if kind == TimerKind::Life || remaining.years > 0 {
            units.push((remaining.years, "years"));
        }
        units.push((remaining.months, "months"));
        units.push((remaining.days, "days"));
    }
    units.extend(clock);
    units
}

fn title(kind: TimerKind) -> &'static str {
    match kind {
        TimerKind::Daily => "Time left today",
        TimerKind::Birthday => "Until your next birthday",
        TimerKind::Life => "Your expected time remaining",
    }
}

fn progress_label(kind: TimerKind) -> &'static str {
    match kind {
        TimerKind::Daily => "Day elapsed",
        TimerKind::Birthday => "Year since your last birthday",
        TimerKind::Life => "Life lived",
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn is_document_hidden() -> bool {
    web_sys::window()
        .and_then(|w| w.document())
        .is_some_and(|d| d.visibility_state() == VisibilityState::Hidden)
}

/// `setInterval` driver that ticks every second while the page is visible
/// and once a minute while it is hidden
struct Ticker {
    _tick: Rc<Closure<dyn FnMut()>>,
    handle: Rc<Cell<Option<i32>>>,
    on_visibility_change: Closure<dyn FnMut()>,
}

impl Ticker {
    fn start(on_tick: impl FnMut() + 'static) -> Ticker {
        let tick = Rc::new(Closure::<dyn FnMut()>::new(on_tick));
        let handle = Rc::new(Cell::new(None));
        restart_interval(&tick, &handle);

        let on_visibility_change = {
            let tick = tick.clone();
            let handle = handle.clone();
            Closure::<dyn FnMut()>::new(move || restart_interval(&tick, &handle))
        };

        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                on_visibility_change.as_ref().unchecked_ref(),
            );
        }

        Ticker {
            _tick: tick,
            handle,
            on_visibility_change,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            if let Some(id) = self.handle.take() {
                window.clear_interval_with_handle(id);
            }
            if let Some(document) = window.document() {
                let _ = document.remove_event_listener_with_callback(
                    "visibilitychange",
                    self.on_visibility_change.as_ref().unchecked_ref(),
                );
            }
        }
    }
}

fn restart_interval(tick: &Closure<dyn FnMut()>, handle: &Cell<Option<i32>>) {
    let Some(window) = web_sys::window() else {
        return;
    };

    if let Some(id) = handle.take() {
        window.clear_interval_with_handle(id);
    }

    let period = if is_document_hidden() {
        HIDDEN_TICK_MS
    } else {
        VISIBLE_TICK_MS
    };

    match window.set_interval_with_callback_and_timeout_and_arguments_0(tick.as_ref().unchecked_ref(), period) {
        Ok(id) => handle.set(Some(id)),
        Err(e) => log::warn!("Failed to start countdown ticker: {:?}", e),
    }
}
