//! Client-side notification core: polling, local events, alert sounds,
//! system notifications and the toast presenter.

pub mod audio;
pub mod events;
pub mod native;
pub mod payload;
pub mod permission;
pub mod presenter;
pub mod sound;
pub mod source;
pub mod widget;
