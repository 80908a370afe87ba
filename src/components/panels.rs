use crate::components::ui::{Button, ButtonSize, ButtonVariant, Spinner};
use crate::lifecycle::DiaryLifecycle;
use crate::models::{DiarySettings, Panel, PanelId};
use leptos::prelude::*;

/// Panels of the lifecycle's diary in backend order. `on_regenerate` is
/// offered per panel while `can_regenerate_panel` holds.
#[component]
pub fn PanelGrid(
    lifecycle: RwSignal<DiaryLifecycle>,
    #[prop(into)] on_regenerate: Callback<PanelId>,
) -> impl IntoView {
    let panels = move || {
        lifecycle.with(|lc| lc.diary().map(|d| d.panels.clone()).unwrap_or_default())
    };

    view! {
        <div class="grid grid-cols-1 gap-4 sm:grid-cols-2">
            {move || {
                panels()
                    .into_iter()
                    .map(|panel| view! { <PanelCard panel=panel lifecycle=lifecycle on_regenerate=on_regenerate /> })
                    .collect_view()
            }}
        </div>
    }
}

#[component]
fn PanelCard(
    panel: Panel,
    lifecycle: RwSignal<DiaryLifecycle>,
    on_regenerate: Callback<PanelId>,
) -> impl IntoView {
    let panel_id = StoredValue::new(panel.panel_id.clone());
    let in_flight = move || {
        lifecycle.with(|lc| panel_id.with_value(|id| lc.panel_in_flight() == Some(id)))
    };
    let disabled = move || !lifecycle.with(|lc| lc.can_regenerate_panel());

    let image = match panel.image_url.clone() {
        Some(src) => view! {
            <img
                src=src
                alt=format!("Panel {}", panel.panel_number)
                class="aspect-square w-full rounded-md border object-cover"
            />
        }
        .into_any(),
        None => view! {
            <div class="flex aspect-square w-full items-center justify-center rounded-md border border-dashed text-xs text-muted-foreground">
                "Image pending"
            </div>
        }
        .into_any(),
    };

    view! {
        <figure class="flex flex-col gap-2 rounded-lg border p-3">
            <div class="flex items-center justify-between">
                <span class="text-xs font-medium text-muted-foreground">{format!("#{}", panel.panel_number)}</span>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Xs
                    attr:disabled=disabled
                    on:click=move |_| on_regenerate.run(panel_id.get_value())
                >
                    <Show when=in_flight fallback=|| ().into_view()>
                        <Spinner class="size-3" />
                    </Show>
                    {move || if in_flight() { "Drawing..." } else { "New image" }}
                </Button>
            </div>
            {image}
            <figcaption class="text-sm leading-relaxed">{panel.text}</figcaption>
        </figure>
    }
}

#[component]
pub fn DiaryTags(settings: DiarySettings) -> impl IntoView {
    let tag = |text: String| {
        view! { <span class="rounded-full bg-secondary px-2 py-0.5 text-xs text-secondary-foreground">{text}</span> }
    };

    let mut tags = Vec::new();
    if !settings.genre.trim().is_empty() {
        tags.push(tag(format!("#{}", settings.genre.trim())));
    }
    if !settings.style.trim().is_empty() {
        tags.push(tag(format!("#{}", settings.style.trim())));
    }
    tags.push(tag(format!("{} cuts", settings.cuts_count)));

    let character = (!settings.character_note.trim().is_empty()).then(|| {
        view! {
            <p class="text-xs text-muted-foreground">
                "Character: " {settings.character_note.clone()}
            </p>
        }
    });

    view! {
        <div class="flex flex-col gap-2">
            <div class="flex flex-wrap gap-1.5">{tags}</div>
            {character}
        </div>
    }
}
