mod animation;
mod components;
mod config;
mod controller;
mod data_source;
mod error;
mod frame_loop;
mod geometry;
mod model;
mod overlay;
mod render;
mod state;
mod util;

use components::app::{App, AppProps};
use config::CockpitConfig;
use tracing::level_filters::LevelFilter;

fn main() {
    console_error_panic_hook::set_once();
    let logging = util::init_logging(LevelFilter::INFO);
    let config = CockpitConfig::load();
    if let (Some(handle), Ok(level)) = (logging.as_ref(), config.level_filter()) {
        util::set_log_level(handle, level);
    }
    yew::Renderer::<App>::with_props(AppProps { config }).render();
}
