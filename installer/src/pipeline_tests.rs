//! Unit tests for build and install orchestration.
//!
//! Archives are written with `WheelBuilder` and extracted for real; the
//! interpreter is described statically and processes go through
//! `StubExecutor`, so no Python installation is needed.

use super::*;
use crate::compat::installed::{InstalledDistribution, InstalledDistributions};
use crate::compat::marker::MarkerEnvironment;
use crate::compat::version::Version;
use crate::extraction::MockWheelExtractor;
use crate::scheme::SchemePaths;
use crate::test_utils::{StubExecutor, TempRoot, WheelBuilder};
use rstest::{fixture, rstest};
use std::fs;

const PYTHON: &str = "/usr/bin/python3";

struct Harness {
    root: TempRoot,
    interpreter: Interpreter,
}

impl Harness {
    fn archive(&self, builder: WheelBuilder) -> Utf8PathBuf {
        builder.write_to(self.root.path()).expect("write wheel")
    }

    fn cache_dir(&self) -> Utf8PathBuf {
        self.root.path().join("cache")
    }

    fn destdir(&self) -> Utf8PathBuf {
        self.root.path().join("dest")
    }

    fn resolved(&self, role: PathRole) -> Utf8PathBuf {
        resolve(self.interpreter.scheme(), &self.destdir(), role).expect("mapped role")
    }

    fn build(&self, archive: &Utf8Path, diagnostics: &mut Diagnostics) -> Result<BuildReport> {
        let executor = StubExecutor::new();
        let options = BuildOptions {
            optimize_levels: &[],
            verify_dependencies: false,
        };
        let context = BuildContext {
            interpreter: &self.interpreter,
            executor: &executor,
            requirements: None,
        };
        build(archive, &self.cache_dir(), &options, &context, diagnostics)
    }

    fn install(&self, diagnostics: &mut Diagnostics) -> Result<InstallReport> {
        install(
            &self.cache_dir(),
            &self.destdir(),
            self.interpreter.scheme(),
            diagnostics,
        )
    }
}

#[fixture]
fn harness() -> Harness {
    let scheme = SchemePaths::new()
        .with(PathRole::Purelib, "/usr/lib/python3.11/site-packages")
        .with(PathRole::Platlib, "/usr/lib64/python3.11/site-packages")
        .with(PathRole::Scripts, "/usr/bin")
        .with(PathRole::Data, "/usr");
    let markers = MarkerEnvironment::from([("python_version".to_owned(), "3.11".to_owned())]);
    Harness {
        root: TempRoot::new(),
        interpreter: Interpreter::new(PYTHON, Version::from_release(&[3, 11, 4]), markers, scheme),
    }
}

#[rstest]
fn build_then_install_places_payload_and_scripts(harness: Harness) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0")
            .file("pkg/__init__.py", "def main():\n    return 0\n")
            .data_file("scripts", "foo", "#!python\nimport pkg\n")
            .entry_points("[console_scripts]\ntool = pkg:main\n"),
    );
    let mut diagnostics = Diagnostics::new();

    let built = harness.build(&archive, &mut diagnostics).expect("build");
    assert_eq!(built.launchers, 1);
    assert_eq!(built.rewritten_scripts, 1);

    let installed = harness.install(&mut diagnostics).expect("install");
    assert_eq!(installed.root_role, PathRole::Purelib);

    let purelib = harness.resolved(PathRole::Purelib);
    let scripts = harness.resolved(PathRole::Scripts);
    assert!(purelib.join("pkg/__init__.py").is_file());
    assert!(purelib.join("pkg-1.0.dist-info/WHEEL").is_file());
    assert!(!purelib.join("pkg-1.0.data").exists());

    let foo = fs::read_to_string(scripts.join("foo")).expect("read foo");
    assert_eq!(foo, "#!/usr/bin/python3\nimport pkg\n");
    let tool = fs::read_to_string(scripts.join("tool")).expect("read launcher");
    assert!(tool.contains("from pkg import main"));

    let kinds: Vec<_> = diagnostics.entries().iter().map(|d| d.kind).collect();
    assert_eq!(kinds, [DiagnosticKind::TagsUnverified]);
}

#[rstest]
#[case::parent_escape("../../escaped")]
#[case::nested_path("sub/tool")]
fn launcher_names_outside_the_scripts_dir_are_skipped(harness: Harness, #[case] name: &str) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0")
            .file("pkg/__init__.py", "def main():\n    return 0\n")
            .entry_points(&format!("[console_scripts]\n{name} = pkg:main\nok = pkg:main\n")),
    );
    let mut diagnostics = Diagnostics::new();

    let built = harness.build(&archive, &mut diagnostics).expect("build");

    assert_eq!(built.launchers, 1);
    assert!(diagnostics.contains(DiagnosticKind::EntryPointSkipped));
    assert!(!harness.root.path().join("escaped").exists());
    assert!(!harness.cache_dir().join("scripts/sub").exists());
    assert!(harness.cache_dir().join("scripts/ok").is_file());
}

#[rstest]
#[case::purelib("true", PathRole::Purelib)]
#[case::platlib("false", PathRole::Platlib)]
fn root_payload_follows_root_is_purelib(
    harness: Harness,
    #[case] root_is_purelib: &str,
    #[case] expected: PathRole,
) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0")
            .root_is_purelib(root_is_purelib)
            .file("pkg/__init__.py", ""),
    );
    let mut diagnostics = Diagnostics::new();
    harness.build(&archive, &mut diagnostics).expect("build");

    let installed = harness.install(&mut diagnostics).expect("install");

    assert_eq!(installed.root_role, expected);
    assert!(harness.resolved(expected).join("pkg/__init__.py").is_file());
}

#[rstest]
fn data_categories_are_routed_or_flagged(harness: Harness) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0")
            .root_is_purelib("false")
            .data_file("purelib", "pure_mod.py", "")
            .data_file("platlib", "plat_mod.py", "")
            .data_file("headers", "pkg.h", "")
            .file("purelib/legacy.py", ""),
    );
    let mut diagnostics = Diagnostics::new();
    harness.build(&archive, &mut diagnostics).expect("build");

    harness.install(&mut diagnostics).expect("install");

    assert!(harness.resolved(PathRole::Purelib).join("pure_mod.py").is_file());
    assert!(harness.resolved(PathRole::Purelib).join("legacy.py").is_file());
    assert!(harness.resolved(PathRole::Platlib).join("plat_mod.py").is_file());
    assert!(!harness.resolved(PathRole::Platlib).join("purelib").exists());
    assert!(diagnostics.contains(DiagnosticKind::UnhandledDataCategory));
    assert!(diagnostics.has_incomplete_installation());
}

#[rstest]
fn installing_twice_is_idempotent(harness: Harness) {
    let archive = harness.archive(WheelBuilder::new("pkg", "1.0").file("pkg/__init__.py", "X = 1\n"));
    let mut diagnostics = Diagnostics::new();
    harness.build(&archive, &mut diagnostics).expect("build");

    let first = harness.install(&mut diagnostics).expect("first install");
    let second = harness.install(&mut diagnostics).expect("second install");

    assert_eq!(first.merged, second.merged);
    let module = harness.resolved(PathRole::Purelib).join("pkg/__init__.py");
    assert_eq!(fs::read_to_string(module).expect("read"), "X = 1\n");
}

#[rstest]
fn newer_wheel_format_aborts_the_build(harness: Harness) {
    let archive = harness.archive(WheelBuilder::new("pkg", "1.0").wheel_version("2.0"));
    let mut diagnostics = Diagnostics::new();

    let result = harness.build(&archive, &mut diagnostics);

    assert!(matches!(result, Err(InstallerError::UnsupportedFormatVersion { .. })));
    assert!(matches!(
        harness.install(&mut diagnostics),
        Err(InstallerError::MissingCache { .. })
    ));
}

#[rstest]
fn missing_wheel_descriptor_aborts_the_build(harness: Harness) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0")
            .without_wheel_file()
            .file("pkg/__init__.py", ""),
    );
    let mut diagnostics = Diagnostics::new();

    let result = harness.build(&archive, &mut diagnostics);
    assert!(matches!(result, Err(InstallerError::MissingMetadataFile { .. })));
}

#[rstest]
fn extraction_failure_stops_later_steps(harness: Harness) {
    let mut extractor = MockWheelExtractor::new();
    extractor.expect_extract().times(1).returning(|archive, _| {
        Err(InstallerError::CorruptArchive {
            path: archive.to_owned(),
            reason: "truncated".to_owned(),
        })
    });
    let executor = StubExecutor::new();
    let levels = OptimizeLevel::DEFAULTS;
    let options = BuildOptions {
        optimize_levels: &levels,
        verify_dependencies: true,
    };
    let context = BuildContext {
        interpreter: &harness.interpreter,
        executor: &executor,
        requirements: None,
    };
    let mut diagnostics = Diagnostics::new();

    let result = build_with(
        &extractor,
        Utf8Path::new("pkg-1.0-py3-none-any.whl"),
        &harness.cache_dir(),
        &options,
        &context,
        &mut diagnostics,
    );

    assert!(matches!(result, Err(InstallerError::CorruptArchive { .. })));
    assert!(executor.calls().is_empty(), "precompilation must not run");
    assert!(diagnostics.is_empty());
}

#[rstest]
fn invalid_archive_name_is_rejected_before_extraction(harness: Harness) {
    let mut extractor = MockWheelExtractor::new();
    extractor.expect_extract().never();
    let executor = StubExecutor::new();
    let options = BuildOptions {
        optimize_levels: &[],
        verify_dependencies: false,
    };
    let context = BuildContext {
        interpreter: &harness.interpreter,
        executor: &executor,
        requirements: None,
    };
    let mut diagnostics = Diagnostics::new();

    let result = build_with(
        &extractor,
        Utf8Path::new("pkg-1.0.whl"),
        &harness.cache_dir(),
        &options,
        &context,
        &mut diagnostics,
    );
    assert!(matches!(result, Err(InstallerError::InvalidName { .. })));
}

#[rstest]
fn precompiles_each_requested_level(harness: Harness) {
    let archive = harness.archive(WheelBuilder::new("pkg", "1.0").file("pkg/__init__.py", ""));
    let executor = StubExecutor::new()
        .respond(PYTHON, 0, "")
        .respond(PYTHON, 0, "");
    let levels = [
        OptimizeLevel::try_from(0).expect("valid"),
        OptimizeLevel::try_from(2).expect("valid"),
    ];
    let options = BuildOptions {
        optimize_levels: &levels,
        verify_dependencies: false,
    };
    let context = BuildContext {
        interpreter: &harness.interpreter,
        executor: &executor,
        requirements: None,
    };
    let mut diagnostics = Diagnostics::new();

    let report = build(&archive, &harness.cache_dir(), &options, &context, &mut diagnostics)
        .expect("build");

    assert_eq!(report.compiled_levels, 2);
    executor.assert_finished();
    let payload = harness.cache_dir().join("pkg");
    let last = executor.calls().pop().expect("two calls");
    assert_eq!(last.last().map(String::as_str), Some(payload.as_str()));
}

#[rstest]
fn dependency_check_uses_the_checker(harness: Harness) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0").core_metadata("Name: pkg\nRequires-Dist: attrs>=20\n"),
    );
    let executor = StubExecutor::new();
    let options = BuildOptions {
        optimize_levels: &[],
        verify_dependencies: true,
    };
    let empty = InstalledDistributions::default();
    let context = BuildContext {
        interpreter: &harness.interpreter,
        executor: &executor,
        requirements: Some(&empty),
    };
    let mut diagnostics = Diagnostics::new();

    let result = build(&archive, &harness.cache_dir(), &options, &context, &mut diagnostics);
    assert!(matches!(result, Err(InstallerError::MissingDependency { .. })));

    let satisfied = InstalledDistributions::from_distributions(vec![InstalledDistribution::new(
        "attrs",
        "23.1.0".parse().ok(),
        &[],
    )]);
    let context = BuildContext {
        requirements: Some(&satisfied),
        ..context
    };
    build(&archive, &harness.cache_dir(), &options, &context, &mut diagnostics)
        .expect("dependencies satisfied");
}

#[rstest]
fn unavailable_checker_is_advisory(harness: Harness) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0").core_metadata("Requires-Dist: attrs>=20\n"),
    );
    let executor = StubExecutor::new();
    let options = BuildOptions {
        optimize_levels: &[],
        verify_dependencies: true,
    };
    let context = BuildContext {
        interpreter: &harness.interpreter,
        executor: &executor,
        requirements: None,
    };
    let mut diagnostics = Diagnostics::new();

    build(&archive, &harness.cache_dir(), &options, &context, &mut diagnostics)
        .expect("build continues");
    assert!(diagnostics.contains(DiagnosticKind::CompatibilityUnchecked));
}

#[rstest]
fn install_without_cache_fails(harness: Harness) {
    let mut diagnostics = Diagnostics::new();
    let result = harness.install(&mut diagnostics);

    assert!(matches!(result, Err(InstallerError::MissingCache { .. })));
    assert!(!harness.destdir().exists());
}

#[rstest]
fn unknown_role_leaves_destination_untouched(harness: Harness) {
    let archive = harness.archive(
        WheelBuilder::new("pkg", "1.0")
            .file("pkg/__init__.py", "")
            .data_file("scripts", "foo", "#!python\n"),
    );
    let mut diagnostics = Diagnostics::new();
    harness.build(&archive, &mut diagnostics).expect("build");
    let scheme = SchemePaths::new().with(PathRole::Purelib, "/usr/lib/python3.11/site-packages");

    let result = install(&harness.cache_dir(), &harness.destdir(), &scheme, &mut diagnostics);

    assert!(matches!(
        result,
        Err(InstallerError::UnknownPathRole {
            role: PathRole::Scripts
        })
    ));
    assert!(!harness.destdir().exists());
}
