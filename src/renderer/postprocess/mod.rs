//! Full-screen passes that build the destination image from the resolved
//! targets: the scene copy, the rim overlay, and the diagnostic quads.

pub mod diagnostics;
pub mod present;
pub mod rim;
mod screen_pass;

pub use screen_pass::ScreenPass;
