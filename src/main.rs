//! Demo window for the renderer.
//!
//! Usage: `rimrender-viewer [OPTIONS.toml]`

use std::path::Path;
use std::process::ExitCode;

use rimrender::{RenderOptions, Viewer};

fn main() -> ExitCode {
    env_logger::init();

    let options = match std::env::args().nth(1) {
        Some(path) => match RenderOptions::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => RenderOptions::default(),
    };

    match Viewer::builder().with_options(options).build().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
