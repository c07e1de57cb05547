use std::process::ExitCode;

mod app;
mod logging;

fn main() -> ExitCode {
    let args = zfin_bridge::cli::parse();
    app::run(args)
}
