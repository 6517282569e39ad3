//! Wheelwright installer CLI entrypoint.
//!
//! This binary queries the target interpreter, builds an installation cache
//! from a wheel archive and merges that cache into the interpreter's
//! installation scheme under a destination root.

use camino::Utf8Path;
use clap::Parser;
use log::debug;
use std::fs;
use std::io::{ErrorKind, Write};
use wheelwright_installer::cli::Cli;
use wheelwright_installer::command::{CommandExecutor, SystemCommandExecutor};
use wheelwright_installer::compat::installed::{InstalledDistributions, RequirementChecker};
use wheelwright_installer::diagnostics::Diagnostics;
use wheelwright_installer::error::{InstallerError, NodeKind, Result};
use wheelwright_installer::interpreter::Interpreter;
use wheelwright_installer::output::{
    Colour, init_logger, render_error, report_diagnostics, write_stderr_line,
};
use wheelwright_installer::pipeline::{BuildContext, BuildOptions, build, install};

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    if init_logger(cli.verbose).is_err() {
        write_stderr_line(&mut stderr, "logger already installed; progress output disabled");
    }
    let colour = Colour::for_stderr();
    let run_result = run(&cli, &SystemCommandExecutor, &mut stderr, colour);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr, colour);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
    colour: Colour,
) -> Result<()> {
    let interpreter = Interpreter::query(executor, &cli.interpreter)?;

    if let Some(wheel) = cli.build_archive() {
        run_build(cli, wheel, &interpreter, executor, stderr, colour)?;
    }

    if cli.runs_install() {
        run_install(cli, &interpreter, stderr, colour)?;
    }

    Ok(())
}

/// Builds the cache, reporting diagnostics even when the build fails.
fn run_build(
    cli: &Cli,
    wheel: &Utf8Path,
    interpreter: &Interpreter,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
    colour: Colour,
) -> Result<()> {
    let levels = cli.optimize_levels()?;
    prepare_cache_dir(&cli.cache_dir)?;

    let installed = if cli.verify_dependencies {
        InstalledDistributions::discover(interpreter.scheme())
    } else {
        None
    };
    let options = BuildOptions {
        optimize_levels: &levels,
        verify_dependencies: cli.verify_dependencies,
    };
    let context = BuildContext {
        interpreter,
        executor,
        requirements: installed
            .as_ref()
            .map(|checker| checker as &dyn RequirementChecker),
    };

    let mut diagnostics = Diagnostics::new();
    let result = build(wheel, &cli.cache_dir, &options, &context, &mut diagnostics);
    report_diagnostics(stderr, diagnostics.entries(), colour);
    let report = result?;
    debug!(
        "built {} into {}: {} file(s), {} launcher(s), {} rewritten script(s)",
        report.wheel.identity,
        cli.cache_dir,
        report.extracted_files,
        report.launchers,
        report.rewritten_scripts
    );

    check_complete("build", &diagnostics, cli.strict())
}

/// Installs the cache under the destination root.
fn run_install(
    cli: &Cli,
    interpreter: &Interpreter,
    stderr: &mut dyn Write,
    colour: Colour,
) -> Result<()> {
    let mut diagnostics = Diagnostics::new();
    let result = install(
        &cli.cache_dir,
        &cli.destdir,
        interpreter.scheme(),
        &mut diagnostics,
    );
    report_diagnostics(stderr, diagnostics.entries(), colour);
    let report = result?;
    debug!(
        "installed {} into {} ({}): {} file(s)",
        report.wheel.identity, cli.destdir, report.root_role, report.merged.files
    );

    check_complete("install", &diagnostics, cli.strict())
}

/// Removes a cache left by an earlier run; a failed build is never resumed.
fn prepare_cache_dir(cache_dir: &Utf8Path) -> Result<()> {
    match fs::metadata(cache_dir) {
        Ok(meta) if meta.is_dir() => {
            debug!("removing existing cache {cache_dir}");
            fs::remove_dir_all(cache_dir).map_err(|e| InstallerError::io(cache_dir, e))
        }
        Ok(_) => Err(InstallerError::DestinationConflict {
            path: cache_dir.to_owned(),
            expected: NodeKind::Directory,
            found: NodeKind::File,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallerError::io(cache_dir, e)),
    }
}

/// Fails a phase whose diagnostics leave the installation incomplete.
fn check_complete(phase: &'static str, diagnostics: &Diagnostics, strict: bool) -> Result<()> {
    if !strict {
        return Ok(());
    }
    let count = diagnostics
        .entries()
        .iter()
        .filter(|d| d.kind.is_incomplete_installation())
        .count();
    if count == 0 {
        Ok(())
    } else {
        Err(InstallerError::IncompleteInstallation { phase, count })
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write, colour: Colour) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, render_error(&err, colour));
            1
        }
    }
}
