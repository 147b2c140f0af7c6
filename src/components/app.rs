use super::cockpit_view::CockpitView;
use crate::config::CockpitConfig;
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct AppProps {
    pub config: CockpitConfig,
}

#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
    html! {
        <div id="root">
            <CockpitView config={props.config.clone()} />
        </div>
    }
}
