//! `whale run` — build a container descriptor and hand off to stage 1.

use std::path::PathBuf;
use std::process::Command;

use clap::Args;
use whale_common::constants::{DEFAULT_RUNTIME_DIR, RUNTIME_DIR_ENV};
use whale_common::types::Volume;
use whale_runtime::container::Container;
use whale_runtime::store;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command and arguments to execute inside the container.
    #[arg(trailing_var_arg = true, default_values_t = [String::from("/bin/sh")])]
    pub command: Vec<String>,

    /// Container name.
    #[arg(long, default_value = "")]
    pub name: String,

    /// Distribution rootfs to use.
    #[arg(long, default_value = "debian")]
    pub image: String,

    /// Run with private or host mount namespace.
    #[arg(long, default_value = "private")]
    pub mount: String,

    /// Run with private or host PID namespace.
    #[arg(short, long, default_value = "private")]
    pub pid: String,

    /// Run with private or host UTS namespace.
    #[arg(short = 's', long, default_value = "private")]
    pub uts: String,

    /// Run with private or host networking.
    #[arg(short, long, default_value = "private")]
    pub net: String,

    /// Run with private or host IPC namespace.
    #[arg(long, default_value = "private")]
    pub ipc: String,

    /// Run as user:group.
    #[arg(short, long, default_value = "root:root")]
    pub user: String,

    /// Environment variables.
    #[arg(short, long)]
    pub env: Vec<String>,

    /// Volumes to mount in the container, as source:target[:ro].
    #[arg(short, long)]
    pub volume: Vec<String>,

    /// Attach stdin to the container.
    #[arg(short, long, action = clap::ArgAction::Set, default_value_t = true)]
    pub interactive: bool,

    /// Memory limit in bytes.
    #[arg(short, long, default_value_t = 0)]
    pub memory: u64,

    /// CPU shares.
    #[arg(short, long, default_value_t = 0)]
    pub cpu: u64,

    /// Runtime directory.
    #[arg(long, default_value = DEFAULT_RUNTIME_DIR)]
    pub rundir: PathBuf,

    /// Path to the stage 1 executable.
    #[arg(long, default_value = "./bin/stage1")]
    pub stage1: PathBuf,

    /// Path to the stage 2 executable.
    #[arg(long, default_value = "./bin/stage2")]
    pub stage2: PathBuf,
}

/// Namespace kinds derived from the host/private toggles.
fn requested_namespaces(args: &RunArgs) -> impl Iterator<Item = String> {
    [
        ("mount", &args.mount),
        ("pid", &args.pid),
        ("uts", &args.uts),
        ("net", &args.net),
        ("ipc", &args.ipc),
    ]
    .into_iter()
    .filter(|(_, mode)| mode.as_str() != "host")
    .map(|(kind, _)| kind.to_string())
    .collect::<Vec<_>>()
    .into_iter()
}

/// Executes the `run` command: persists the descriptor and spawns the
/// stage 1 process with the runtime directory in its environment.
///
/// # Errors
///
/// Returns an error if the descriptor cannot be built or persisted, or
/// if stage 1 cannot be spawned.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let mut container = Container::new(&args.name);
    container.image = args.image.clone();
    container.runtime_dir = args.rundir.clone();
    container.cpu_shares = args.cpu;
    container.memory = args.memory;
    container.interactive = args.interactive;
    container.user = args.user.clone();
    container.env = args.env.clone();
    container.cmd = args.command.clone();
    container.stage1 = args.stage1.clone();
    container.stage2 = args.stage2.clone();
    container.namespaces = requested_namespaces(&args).collect();
    for spec in &args.volume {
        container.add_volume(Volume::parse(spec)?);
    }

    container.dir = store::create_state_dir(&args.rundir, container.id.as_str())?;
    store::save(&container)?;
    tracing::info!(id = %container.id, name = %container.name, "container created");

    let status = Command::new(&container.stage1)
        .arg(container.id.as_str())
        .env(RUNTIME_DIR_ENV, &args.rundir)
        .status()
        .map_err(|e| anyhow::anyhow!("failed to spawn {}: {e}", container.stage1.display()))?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
