use std::process::ExitCode;

mod app;
mod candidate;
mod config;
mod coordinator;
mod fallback;
mod media;
mod page;
mod preload;
mod runner;
mod scenario;
mod selector;
mod sim;
mod source;
mod timer;
mod unlock;
mod visibility;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let result = app::start().await;
    match result {
        Ok(..) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
