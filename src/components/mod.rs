pub mod ui;

mod header;
mod notice;
mod panels;

pub use header::Header;
pub use notice::{ErrorAlert, InfoAlert};
pub use panels::{DiaryTags, PanelGrid};
