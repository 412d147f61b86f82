use leptos::html::Canvas;
use leptos::*;
use web_sys::HtmlCanvasElement;

use crate::application::{LegendValues, TooltipPayload};
use crate::presentation::runtime::OverlaySignals;

const OVERLAY_STYLE: &str = r#"
.chart-overlay {
    position: absolute;
    inset: 0;
    pointer-events: none;
}

.chart-overlay canvas {
    position: absolute;
    left: 0;
    top: 0;
}

.chart-overlay .flash {
    position: absolute;
    inset: 0;
    background: #ffffff;
    transition: opacity 0.3s ease-out;
}

.chart-overlay .tooltip {
    position: absolute;
    padding: 6px 8px;
    background: rgba(15, 23, 42, 0.92);
    border: 1px solid #334155;
    border-radius: 4px;
    color: #e2e8f0;
    font: 11px 'SF Mono', Consolas, monospace;
    white-space: pre;
    transform: translate(12px, 12px);
}

.chart-overlay .tooltip .secondary {
    color: #94a3b8;
}

.chart-overlay .legend {
    position: absolute;
    left: 8px;
    top: 6px;
    color: #cbd5e1;
    font: 11px 'SF Mono', Consolas, monospace;
}
"#;

/// Transparent layer over the chart widget: overlay canvas, capture flash,
/// hover tooltip and the idle legend.
///
/// `on_canvas` fires once the overlay canvas is in the DOM.
#[component]
pub fn ChartOverlay(signals: OverlaySignals, #[prop(into)] on_canvas: Callback<HtmlCanvasElement>) -> impl IntoView {
    let canvas_ref = create_node_ref::<Canvas>();

    create_effect(move |attached: Option<bool>| {
        if attached == Some(true) {
            return true;
        }
        match canvas_ref.get() {
            Some(canvas) => {
                let element: &HtmlCanvasElement = &canvas;
                on_canvas.call(element.clone());
                true
            }
            None => false,
        }
    });

    let flashing = signals.flashing;

    view! {
        <div class="chart-overlay">
            <style>{OVERLAY_STYLE}</style>
            <canvas node_ref=canvas_ref />
            <div class="flash" style:opacity=move || if flashing.get() { "0.6" } else { "0" } />
            <SessionLegend legend=signals.legend />
            <OverlayTooltip tooltip=signals.tooltip />
        </div>
    }
}

#[component]
fn OverlayTooltip(tooltip: RwSignal<Option<TooltipPayload>>) -> impl IntoView {
    view! {
        <div
            class="tooltip"
            style:display=move || if tooltip.with(Option::is_some) { "block" } else { "none" }
            style:left=move || tooltip.with(|t| t.as_ref().map(|t| format!("{}px", t.x)).unwrap_or_default())
            style:top=move || tooltip.with(|t| t.as_ref().map(|t| format!("{}px", t.y)).unwrap_or_default())
        >
            <div class="primary">
                {move || tooltip.with(|t| t.as_ref().map(|t| t.primary_label.clone()).unwrap_or_default())}
            </div>
            <div class="secondary">
                {move || tooltip.with(|t| t.as_ref().map(|t| t.secondary_label.clone()).unwrap_or_default())}
            </div>
        </div>
    }
}

/// Latest bar summary, shown while nothing is hovered.
#[component]
fn SessionLegend(legend: RwSignal<Option<LegendValues>>) -> impl IntoView {
    view! {
        <div class="legend">
            {move || {
                legend.with(|l| l.as_ref().map(|l| format!("{}  {}", l.time_label, l.label)).unwrap_or_default())
            }}
        </div>
    }
}
