//! Archive creation and upload of collected output.

pub mod archive;
pub mod upload;
