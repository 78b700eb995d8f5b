/// Settings popup for Countdown Tab

use chrono::Local;
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::background::BackgroundMessage;
use crate::chrome;
use crate::settings::{MAX_LIFE_EXPECTANCY_YEARS, MIN_LIFE_EXPECTANCY_YEARS, TimerKind, TimerSettings};
use crate::storage::{load_or_default, SettingsBackend, SettingsStore};

#[derive(Clone, PartialEq)]
enum PopupState {
    Loading,
    Idle,
    Saving,
    Saved,
    Error(String),
}

#[derive(Clone, PartialEq, Default)]
struct FormValues {
    kind: TimerKind,
    birth_date: String,
    life_expectancy: String,
}

impl FormValues {
    fn from_settings(settings: &TimerSettings) -> Self {
        FormValues {
            kind: settings.timer_kind,
            birth_date: settings.birth_date.clone().unwrap_or_default(),
            life_expectancy: settings
                .life_expectancy_years
                .map(|years| years.to_string())
                .unwrap_or_default(),
        }
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let store = use_state(SettingsBackend::detect);
    let state = use_state(|| PopupState::Loading);
    let form = use_state(FormValues::default);

    // Load current settings on mount
    {
        let store = store.clone();
        let state = state.clone();
        let form = form.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                let settings = load_or_default(&*store).await;
                form.set(FormValues::from_settings(&settings));
                state.set(PopupState::Idle);
            });
            || ()
        });
    }

    let on_kind_change = {
        let form = form.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                form.set(FormValues {
                    kind: TimerKind::from_value(&select.value()),
                    ..(*form).clone()
                });
            }
        })
    };

    let on_birth_date_input = {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                form.set(FormValues {
                    birth_date: input.value(),
                    ..(*form).clone()
                });
            }
        })
    };

    let on_life_expectancy_input = {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                form.set(FormValues {
                    life_expectancy: input.value(),
                    ..(*form).clone()
                });
            }
        })
    };

    // Save handler
    let on_save = {
        let store = store.clone();
        let state = state.clone();
        let form = form.clone();

        Callback::from(move |_| {
            let today = Local::now().date_naive();
            let settings = match TimerSettings::from_form(form.kind, &form.birth_date, &form.life_expectancy, today) {
                Ok(settings) => settings,
                Err(e) => {
                    state.set(PopupState::Error(e.reason().to_string()));
                    return;
                }
            };

            let store = (*store).clone();
            let state = state.clone();
            state.set(PopupState::Saving);

            spawn_local(async move {
                match store.set(&settings).await {
                    Ok(_) => state.set(PopupState::Saved),
                    Err(e) => state.set(PopupState::Error(format!("Failed to save: {}", e))),
                }
            });
        })
    };

    // Reset handler
    let on_reset = {
        let store = store.clone();
        let state = state.clone();
        let form = form.clone();

        Callback::from(move |_| {
            let store = (*store).clone();
            let state = state.clone();
            let form = form.clone();
            state.set(PopupState::Saving);

            spawn_local(async move {
                if let Err(e) = store.clear().await {
                    state.set(PopupState::Error(format!("Failed to reset: {}", e)));
                    return;
                }
                form.set(FormValues::default());

                if let Err(e) = notify_background(BackgroundMessage::ResetTabTracking).await {
                    log::warn!("{}", e);
                }
                state.set(PopupState::Idle);
            });
        })
    };

    let is_busy = matches!(*state, PopupState::Loading | PopupState::Saving);

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Countdown Tab"}</h1>

            <div class="flex-column-gap">
                <label class="form-label" for="timer-kind">{"Countdown"}</label>
                <select id="timer-kind" class="form-input" onchange={on_kind_change} disabled={is_busy}>
                    <option value="daily" selected={form.kind == TimerKind::Daily}>{"Until midnight"}</option>
                    <option value="birthday" selected={form.kind == TimerKind::Birthday}>{"Until my next birthday"}</option>
                    <option value="life" selected={form.kind == TimerKind::Life}>{"Life expectancy"}</option>
                </select>

                if form.kind.needs_birth_date() {
                    <label class="form-label" for="birth-date">{"Birth date"}</label>
                    <input
                        id="birth-date"
                        class="form-input"
                        type="date"
                        value={form.birth_date.clone()}
                        oninput={on_birth_date_input}
                        disabled={is_busy}
                    />
                }

                if form.kind == TimerKind::Life {
                    <label class="form-label" for="life-expectancy">{"Life expectancy (years)"}</label>
                    <input
                        id="life-expectancy"
                        class="form-input"
                        type="number"
                        min={MIN_LIFE_EXPECTANCY_YEARS.to_string()}
                        max={MAX_LIFE_EXPECTANCY_YEARS.to_string()}
                        step="0.1"
                        value={form.life_expectancy.clone()}
                        oninput={on_life_expectancy_input}
                        disabled={is_busy}
                    />
                }

                <Button onclick={on_save} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                    {"Save"}
                </Button>
                <Button onclick={on_reset} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"Reset settings"}
                </Button>
            </div>

            // Status display
            {match &*state {
                PopupState::Loading | PopupState::Saving => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                PopupState::Saved => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Success} title={"Settings saved"} inline={true}>
                        </Alert>
                    </div>
                },
                PopupState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                PopupState::Idle => html! {}
            }}

            <p class="footer-popup">
                {"Countdown Tab v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

async fn notify_background(message: BackgroundMessage) -> Result<(), String> {
    let message_js = serde_wasm_bindgen::to_value(&message)
        .map_err(|e| format!("Failed to serialize message: {:?}", e))?;

    chrome::runtime_send_message(message_js)
        .await
        .map_err(|e| format!("Failed to reach background: {:?}", e))?;

    Ok(())
}
