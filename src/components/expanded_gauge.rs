use crate::model::GaugeSnapshot;
use crate::util::{format_trend, format_value};
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct ExpandedGaugeProps {
    pub gauge: Option<GaugeSnapshot>,
    pub on_close: Callback<()>,
}

/// Detail card opened by a double tap.
#[function_component]
pub fn ExpandedGauge(props: &ExpandedGaugeProps) -> Html {
    let Some(g) = props.gauge.as_ref() else {
        return html! {};
    };
    let close_btn = {
        let cb = props.on_close.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let row_style = "display:flex; justify-content:space-between; gap:24px; margin:4px 0;";
    let value_style = "font-variant-numeric:tabular-nums; font-weight:600;";
    let trend = g.trend_percent.map(format_trend).unwrap_or_else(|| "-".into());
    let fraction = if g.max > g.min { ((g.value - g.min) / (g.max - g.min)).clamp(0.0, 1.0) } else { 0.0 };
    html! {
        <div style={format!("position:absolute; top:50%; left:50%; transform:translate(-50%, -50%); background:rgba(0,0,0,0.85); border:2px solid {}; padding:24px 32px; border-radius:12px; min-width:320px; color:#e6edf3;", g.color)}>
            <h2 style={format!("margin:0 0 12px 0; color:{};", g.color)}>{ &g.label }</h2>
            <div style={row_style}><span>{"Value"}</span><span style={value_style}>{ format_value(g.value) }</span></div>
            <div style={row_style}><span>{"Target"}</span><span style={value_style}>{ format_value(g.target) }</span></div>
            <div style={row_style}><span>{"Range"}</span><span style={value_style}>{ format!("{} - {}", format_value(g.min), format_value(g.max)) }</span></div>
            <div style={row_style}><span>{"Trend"}</span><span style={value_style}>{ trend }</span></div>
            <div style="margin-top:12px; height:6px; background:#30363d; border-radius:3px; overflow:hidden;">
                <div style={format!("height:100%; width:{:.1}%; background:{};", fraction * 100.0, g.color)}></div>
            </div>
            <div style="margin-top:16px; display:flex; justify-content:center;">
                <button onclick={close_btn}>{"Close"}</button>
            </div>
        </div>
    }
}
