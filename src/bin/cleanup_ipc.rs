//! # IPC Cleanup Utility
//!
//! A standalone binary that lists or unlinks POSIX shared-memory segments
//! and named semaphores by name prefix. Kernel-persistent IPC objects
//! outlive the process that created them, so a channel whose creator
//! crashed mid-operation leaves its six objects behind; this tool is the
//! best-effort recovery path named in §6 of the design, and is the one
//! "CLI" explicitly in scope (infrastructure, not a demo).
//!
//! Named objects live under `/dev/shm` on Linux: a shared-memory segment
//! `/N_request` appears as the file `N_request`, and a semaphore `/N_req_empty`
//! appears as `sem.N_req_empty`. Only entries whose name (after stripping the
//! `sem.` marker) starts with the given prefix are ever touched.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shm_rpc_bridge::ipc::primitives::{NamedSemaphore, ShmSegment};
use shm_rpc_bridge::logging;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const SHM_DIR: &str = "/dev/shm";

#[derive(Parser, Debug)]
#[command(
    name = "cleanup-ipc",
    about = "List or unlink stale POSIX shared-memory segments and named semaphores"
)]
struct Cli {
    /// Only consider objects whose name starts with this prefix. Omitting
    /// it matches every object under /dev/shm — use with care.
    #[arg(long)]
    prefix: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print matching objects without removing anything.
    List,
    /// Unlink every matching object.
    Unlink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    SharedMemory,
    Semaphore,
}

impl ObjectKind {
    fn label(self) -> &'static str {
        match self {
            ObjectKind::SharedMemory => "shared-memory",
            ObjectKind::Semaphore => "semaphore",
        }
    }
}

#[derive(Debug)]
struct KernelObject {
    kind: ObjectKind,
    /// The POSIX name, including the leading `/`, as passed to
    /// `shm_open`/`sem_open`.
    posix_name: String,
}

fn main() -> Result<()> {
    logging::init_interactive();
    let cli = Cli::parse();

    let prefix = cli.prefix.unwrap_or_default();
    if prefix.is_empty() {
        warn!("no --prefix given; matching every object under {SHM_DIR}");
    }

    let objects = discover(SHM_DIR, &prefix)?;

    match cli.action {
        Action::List => {
            if objects.is_empty() {
                println!("no matching objects under {SHM_DIR}");
            }
            for object in &objects {
                println!("{:<14} {}", object.kind.label(), object.posix_name);
            }
        }
        Action::Unlink => {
            for object in &objects {
                let result = match object.kind {
                    ObjectKind::SharedMemory => ShmSegment::unlink_by_name(&object.posix_name),
                    ObjectKind::Semaphore => NamedSemaphore::unlink(&object.posix_name),
                };
                match result {
                    Ok(()) => info!(name = %object.posix_name, kind = object.kind.label(), "unlinked"),
                    Err(e) => warn!(name = %object.posix_name, kind = object.kind.label(), error = %e, "unlink failed"),
                }
            }
            println!("unlinked {} object(s)", objects.len());
        }
    }

    Ok(())
}

/// Enumerate the kernel objects under `shm_dir` whose name starts with
/// `prefix`, classifying semaphores (the `sem.` marker glibc gives their
/// backing file) separately from plain shared-memory segments. Never
/// returns an entry that does not start with `prefix`, so a caller cannot
/// accidentally unlink an unrelated object on the host.
fn discover(shm_dir: &str, prefix: &str) -> Result<Vec<KernelObject>> {
    let mut found = Vec::new();
    let dir = match fs::read_dir(Path::new(shm_dir)) {
        Ok(dir) => dir,
        Err(e) => {
            warn!(dir = shm_dir, error = %e, "could not read shared-memory directory");
            return Ok(found);
        }
    };

    for entry in dir.flatten() {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if let Some(sem_name) = file_name.strip_prefix("sem.") {
            if sem_name.starts_with(prefix) {
                found.push(KernelObject {
                    kind: ObjectKind::Semaphore,
                    posix_name: format!("/{sem_name}"),
                });
            }
        } else if file_name.starts_with(prefix) {
            found.push(KernelObject {
                kind: ObjectKind::SharedMemory,
                posix_name: format!("/{file_name}"),
            });
        }
    }

    found.sort_by(|a, b| a.posix_name.cmp(&b.posix_name));
    Ok(found)
}
