use crate::components::ui::{Alert, AlertDescription};
use leptos::prelude::*;

/// Inline error box; renders nothing while `message` is `None`.
#[component]
pub fn ErrorAlert(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || message.with(Option::is_some) fallback=|| ().into_view()>
            {move || {
                message.get().map(|e| {
                    view! {
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                        </Alert>
                    }
                })
            }}
        </Show>
    }
}

#[component]
pub fn InfoAlert(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || message.with(Option::is_some) fallback=|| ().into_view()>
            {move || {
                message.get().map(|m| {
                    view! {
                        <Alert>
                            <AlertDescription class="text-xs">{m}</AlertDescription>
                        </Alert>
                    }
                })
            }}
        </Show>
    }
}
