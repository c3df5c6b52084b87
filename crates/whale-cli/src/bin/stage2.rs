//! Stage 2 executable: container execution inside the new namespaces.
//!
//! Spawned by stage 1 via `clone(2)` with the resolved namespace
//! flags. On success it never returns from `execute` — the user
//! command replaces this process image and its exit code becomes the
//! container's exit code.

use whale_runtime::{stage2, store};

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
        tracing::error!("usage: stage2 <container-id>");
        std::process::exit(1);
    };

    // execute only ever returns with an error; success is an exec.
    let err = match stage2::execute(&runtime_dir, id) {
        Err(e) => e,
        Ok(never) => match never {},
    };
    tracing::error!(error = %err, "stage 2 execution failed");
    std::process::exit(1);
}
