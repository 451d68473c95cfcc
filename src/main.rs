//! Command-line front end: diff two files into a change-set, or apply a
//! change-set to reconstruct a file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ctxdiff::errors::DiffError;
use ctxdiff::line::LineStore;
use ctxdiff::{apply_changeset, build_changeset};

/// Line diff/patch anchored by unique context windows instead of line numbers.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Reference file (the "from" side in both modes)
    reference: PathBuf,

    /// File to diff against, or the output file with --apply
    target: PathBuf,

    /// Change-set file: written in diff mode, read with --apply
    changeset: PathBuf,

    /// Apply CHANGESET to REFERENCE, writing TARGET
    #[arg(long)]
    apply: bool,
}

fn open_reader(path: &Path) -> Result<BufReader<File>, DiffError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| DiffError::CantOpen {
            path: path.display().to_string(),
            source,
        })
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, DiffError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| DiffError::CantOpen {
            path: path.display().to_string(),
            source,
        })
}

/// Run the requested mode. `created` records the output path once the file
/// exists on disk, so a failing run can clean it up.
fn run(cli: &Cli, created: &mut Option<PathBuf>) -> Result<(), DiffError> {
    if cli.apply {
        let reference = LineStore::from_reader(open_reader(&cli.reference)?)?;
        let changeset = open_reader(&cli.changeset)?;

        let out = create_writer(&cli.target)?;
        *created = Some(cli.target.clone());
        apply_changeset(&reference, changeset, out)
    } else {
        let reference = LineStore::from_reader(open_reader(&cli.reference)?)?;
        let dest = LineStore::from_reader(open_reader(&cli.target)?)?;
        tracing::debug!(
            reference_lines = reference.len(),
            destination_lines = dest.len(),
            "inputs loaded"
        );

        let out = create_writer(&cli.changeset)?;
        *created = Some(cli.changeset.clone());
        build_changeset(&reference, &dest, out)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut created = None;

    match run(&cli, &mut created) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // A partially written output is useless; remove it.
            if let Some(partial) = created {
                if let Err(remove_err) = fs::remove_file(&partial) {
                    tracing::warn!(
                        "failed to remove partial output `{}`: {remove_err}",
                        partial.display()
                    );
                }
            }
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
