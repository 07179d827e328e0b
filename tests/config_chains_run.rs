// tests/config_chains_run.rs

mod common;

use std::sync::Arc;

use common::Harness;

use taskseq::backend::chain_from_config;
use taskseq::fs::FileSystem;
use taskseq_test_utils::builders::ChainConfigBuilder;
use taskseq_test_utils::init_tracing;

#[test]
fn config_steps_drive_sink_and_files() {
    init_tracing();

    let mut h = Harness::with_max_in_flight(1);
    let fs: Arc<dyn FileSystem> = Arc::new(h.fs.clone());

    let chain_cfg = ChainConfigBuilder::new("demo")
        .append("first")
        .write_file("notes.txt", "written")
        .shell("echo into-sink")
        .shell_to_file("ls", "listing.txt")
        .shell_discard("noise")
        .append("last\n")
        .build();
    h.submit(chain_from_config(&chain_cfg, fs)).unwrap();

    // Every process prints one line.
    h.drain("line\n");

    assert_eq!(h.fs.contents("notes.txt").as_deref(), Some("written"));
    assert_eq!(h.fs.contents("listing.txt").as_deref(), Some("line\n"));
    assert_eq!(h.sink.persisted(), "first\nline\nlast\n");
    assert_eq!(
        h.spawned.iter().map(|(_, c)| c.as_str()).collect::<Vec<_>>(),
        vec!["echo into-sink", "ls", "noise"]
    );
    assert!(h.core.is_idle());
}
