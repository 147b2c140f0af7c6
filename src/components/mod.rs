pub mod app;
pub mod camera_controls;
pub mod cockpit_view;
pub mod expanded_gauge;
