//! Stage 1 executable: container preparation in the host namespaces.
//!
//! Invoked by `whale run` with the container id as its sole argument
//! and `WHALE_RUNTIME_DIR` in the environment. Exits with stage 2's
//! status so the container's exit code propagates to the CLI.

use whale_common::error::WhaleError;
use whale_runtime::{stage1, store};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let runtime_dir = match store::runtime_dir_from_env() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!(error = %e, "unable to determine runtime directory");
            std::process::exit(1);
        }
    };
    let args: Vec<String> = std::env::args().collect();
    let [_, id] = args.as_slice() else {
        tracing::error!("usage: stage1 <container-id>");
        std::process::exit(1);
    };

    match stage1::execute(&runtime_dir, id) {
        Ok(_) => {}
        Err(WhaleError::StageFailed { stage, code }) => {
            tracing::error!(stage, code, "stage 2 exited with error");
            std::process::exit(code);
        }
        Err(e) => {
            tracing::error!(error = %e, "stage 1 execution failed");
            std::process::exit(1);
        }
    }
}
