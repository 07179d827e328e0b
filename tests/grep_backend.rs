// tests/grep_backend.rs

mod common;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use common::Harness;

use taskseq::backend::{
    prepare_search, resolve_in_path, shell_quote, GrepBackend, SearchBackend, SearchRequest,
};
use taskseq::errors::{Result as SeqResult, SequencerError};
use taskseq::fs::FileSystem;
use taskseq::task::{Chain, Task};
use taskseq_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn request(pattern: &str) -> SearchRequest {
    SearchRequest {
        pattern: pattern.to_string(),
        files: vec![PathBuf::from("src/lib.rs"), PathBuf::from("README.md")],
        dirs: vec![PathBuf::from("src"), PathBuf::from("tests")],
        source_file: PathBuf::from("/tmp/search.files"),
        includes: vec!["*.rs".to_string()],
    }
}

#[test]
fn grep_chain_has_header_listing_walks_search_and_footer() -> TestResult {
    init_tracing();

    let h = Harness::with_max_in_flight(1);
    let backend = GrepBackend::new(Arc::new(h.fs.clone()));
    let chain = backend.build_chain(&request("fn \\w+"))?;

    let labels: Vec<&str> = chain.iter().map(|t| t.label()).collect();
    assert_eq!(labels.first(), Some(&"grep header"));
    assert_eq!(labels.get(1), Some(&"write file list"));
    assert_eq!(labels.last(), Some(&"grep footer"));
    assert_eq!(chain.len(), 6);

    let commands: Vec<&str> = chain.iter().filter_map(|t| t.command()).collect();
    assert_eq!(
        commands,
        vec![
            "find 'src' -type f \\( -name '*.rs' \\)",
            "find 'tests' -type f \\( -name '*.rs' \\)",
            "tr '\\n' '\\000' < '/tmp/search.files' | xargs -0 grep -nH -E -e 'fn \\w+' --",
        ]
    );
    Ok(())
}

#[test]
fn invalid_pattern_is_rejected_before_anything_runs() {
    init_tracing();

    let h = Harness::with_max_in_flight(1);
    let backend = GrepBackend::new(Arc::new(h.fs.clone()));

    let err = backend
        .build_chain(&request("(unclosed"))
        .expect_err("pattern does not compile");
    assert!(matches!(err, SequencerError::InvalidPattern(_)));
}

#[test]
fn find_is_only_required_for_directories() {
    let h = Harness::with_max_in_flight(1);
    let backend = GrepBackend::new(Arc::new(h.fs.clone()));

    let mut req = request("x");
    assert!(backend.required_tools(&req).contains(&"find"));
    req.dirs.clear();
    assert_eq!(backend.required_tools(&req), vec!["grep", "xargs", "tr"]);
}

#[test]
fn grep_chain_writes_listing_and_frames_results() -> TestResult {
    init_tracing();

    let mut h = Harness::with_max_in_flight(1);
    let fs: Arc<dyn FileSystem> = Arc::new(h.fs.clone());
    let mut req = request("needle");
    req.dirs = vec![PathBuf::from("src")];

    h.submit(GrepBackend::new(fs).build_chain(&req)?)?;

    // Header, listing, then the `find` process.
    h.tick();
    h.tick();
    h.tick();
    let find = h.last_spawned();
    h.output(find, "src/main.rs\n");
    h.exit(find);

    h.tick();
    let grep = h.last_spawned();
    h.output(grep, "src/main.rs:3:needle\n");
    h.exit(grep);
    h.run_until_blocked();

    assert_eq!(
        h.fs.contents("/tmp/search.files").as_deref(),
        Some("src/lib.rs\nREADME.md\nsrc/main.rs\n")
    );
    assert_eq!(
        h.sink.persisted(),
        "-*- grep: needle -*-\nsrc/main.rs:3:needle\n-*- grep finished -*-\n"
    );
    assert!(h.core.is_idle());
    Ok(())
}

struct NeedsMissingTool;

impl SearchBackend for NeedsMissingTool {
    fn name(&self) -> &str {
        "missing"
    }

    fn required_tools(&self, _request: &SearchRequest) -> Vec<&'static str> {
        vec!["taskseq-no-such-tool-anywhere"]
    }

    fn build_chain(&self, _request: &SearchRequest) -> SeqResult<Chain> {
        Ok(Chain::new().then(Task::plain("unreachable", || Ok(()))))
    }
}

#[test]
fn missing_tool_fails_before_building_the_chain() {
    init_tracing();

    let err = prepare_search(&NeedsMissingTool, &request("x")).expect_err("tool is missing");
    match err {
        SequencerError::MissingTool(tool) => assert_eq!(tool, "taskseq-no-such-tool-anywhere"),
        other => panic!("expected MissingTool, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn resolve_in_path_finds_only_executables() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;

    // Not executable in the first directory, executable in the second.
    std::fs::write(first.path().join("tool"), "#!/bin/sh\n")?;
    let exe = second.path().join("tool");
    std::fs::write(&exe, "#!/bin/sh\n")?;
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755))?;

    let path_var = std::env::join_paths([first.path(), second.path()])?;
    let path_var = path_var.to_string_lossy();

    assert_eq!(resolve_in_path("tool", &path_var), Some(exe));
    assert_eq!(resolve_in_path("other", &path_var), None);
    assert_eq!(resolve_in_path("tool", ""), None);
    Ok(())
}

#[test]
fn shell_quote_escapes_single_quotes() {
    assert_eq!(shell_quote("plain"), "'plain'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
}
