//! Tests for installer CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["wheelwright-installer", "pkg-1.0-py3-none-any.whl"]);
    assert_eq!(
        cli.wheel,
        Some(Utf8PathBuf::from("pkg-1.0-py3-none-any.whl"))
    );
    assert!(!cli.verbose);
    assert_eq!(cli.optimize, [0, 1, 2]);
    assert_eq!(cli.destdir, Utf8PathBuf::from("/"));
    assert!(!cli.verify_dependencies);
    assert_eq!(
        cli.build_archive(),
        Some(Utf8Path::new("pkg-1.0-py3-none-any.whl"))
    );
    assert!(cli.runs_install());
    assert!(cli.strict());
    assert_eq!(cli.cache_dir, Utf8PathBuf::from(".install-cache"));
    assert_eq!(cli.interpreter, "python3");
}

#[test]
fn cli_parses_explicit_levels() {
    let cli = Cli::parse_from(["wheelwright-installer", "pkg.whl", "-o", "2", "0"]);
    let levels: Vec<u8> = cli
        .optimize_levels()
        .expect("valid levels")
        .into_iter()
        .map(OptimizeLevel::get)
        .collect();
    assert_eq!(levels, [2, 0]);
}

#[rstest]
#[case::long_flags(&["wheelwright-installer", "pkg.whl", "--destdir", "/tmp/root", "--cache-dir", "/tmp/c"])]
#[case::short_flags(&["wheelwright-installer", "pkg.whl", "-d", "/tmp/root", "--cache-dir", "/tmp/c"])]
fn cli_parses_directories(#[case] args: &[&str]) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.destdir, Utf8PathBuf::from("/tmp/root"));
    assert_eq!(cli.cache_dir, Utf8PathBuf::from("/tmp/c"));
}

#[test]
fn skip_build_does_not_need_a_wheel() {
    let cli = Cli::parse_from(["wheelwright-installer", "--skip-build"]);
    assert!(cli.wheel.is_none());
    assert!(cli.build_archive().is_none());
    assert!(cli.runs_install());
}

#[test]
fn skip_build_ignores_a_given_wheel() {
    let cli = Cli::parse_from(["wheelwright-installer", "pkg.whl", "--skip-build"]);
    assert!(cli.wheel.is_some());
    assert!(cli.build_archive().is_none());
}

#[test]
fn cache_only_skips_install() {
    let cli = Cli::parse_from(["wheelwright-installer", "pkg.whl", "-c", "-w", "-t", "-v"]);
    assert_eq!(cli.build_archive(), Some(Utf8Path::new("pkg.whl")));
    assert!(!cli.runs_install());
    assert!(!cli.strict());
    assert!(cli.verify_dependencies);
    assert!(cli.verbose);
}

#[rstest]
#[case::missing_wheel(&["wheelwright-installer"])]
#[case::conflicting_phases(&["wheelwright-installer", "pkg.whl", "--cache", "--skip-build"])]
#[case::level_out_of_range(&["wheelwright-installer", "pkg.whl", "-o", "3"])]
#[case::level_not_a_number(&["wheelwright-installer", "pkg.whl", "-o", "fast"])]
fn cli_rejects_invalid_arguments(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}
