use anyhow::{ensure, Context, Result};
use clap::{crate_version, Parser};
use dirhasher::{hash_tree, open_tree, Digest, Scheme};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod opts;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "Compute the h1: content digest of a module directory or zip archive",
    after_help = "\
The digest depends only on the names and contents of the files in the tree, not on permissions, \
timestamps, or whether the tree is a directory or a zip archive.

Set DIRHASHER_LOG (e.g., `DIRHASHER_LOG=debug`) to control log output on standard error.
"
)]
#[remain::sorted]
struct Opts {
    #[clap(
        long,
        value_name = "DIGEST",
        help = "Fail unless the computed digest equals DIGEST"
    )]
    expect: Option<Digest>,

    #[clap(name = "PATH", help = "Directory or zip archive to hash")]
    path: PathBuf,

    #[clap(
        long,
        default_value = "",
        help = "Prefix joined to every path before hashing, e.g., `example.com/m@v1.0.0`"
    )]
    prefix: String,

    #[clap(long, help = "Log enumerated files and the final digest to standard error")]
    verbose: bool,
}

fn main() -> Result<()> {
    init_logging();

    let opts = opts::get();

    let mut tree = open_tree(&opts.path)?;
    let digest = hash_tree(Scheme::Hash1, &opts.prefix, tree.as_mut())
        .with_context(|| format!("failed to hash `{}`", opts.path.display()))?;

    if let Some(expected) = &opts.expect {
        ensure!(
            &digest == expected,
            "digest mismatch for `{}`: expected {expected}, found {digest}",
            opts.path.display()
        );
    }

    println!("{digest}");

    Ok(())
}

fn init_logging() {
    let default = if opts::get().verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var("DIRHASHER_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
