// tests/process_runner.rs
//
// These tests spawn real `sh` processes.
#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;

use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

use taskseq::engine::{ProcessId, ProcessOutcome, RuntimeOptions, SchedulerEvent, Sequencer};
use taskseq::exec::runner_loop::RunnerRequest;
use taskseq::exec::{spawn_runner, ProcessRequest};
use taskseq::fs::RealFileSystem;
use taskseq::sink::FileSink;
use taskseq::task::{Chain, Task};
use taskseq_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn batch_options() -> RuntimeOptions {
    RuntimeOptions {
        tick_delay: Duration::from_millis(5),
        progress_tick: Duration::from_millis(50),
        exit_when_idle: true,
        ..RuntimeOptions::default()
    }
}

fn append(text: &'static str) -> Task {
    Task::in_sink(format!("append {text:?}"), move |sink| {
        sink.append_text(text);
        Ok(())
    })
}

#[tokio::test]
async fn real_processes_write_into_the_result_file() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let results = dir.path().join("results.txt");
    let fs = Arc::new(RealFileSystem);
    let sink = Box::new(FileSink::new(&results, fs.clone()));

    let sequencer = Sequencer::start(batch_options(), sink, fs);
    sequencer
        .handle()
        .submit_chain(
            Chain::new()
                .then(append("a\n"))
                .then(Task::external_process_to_sink("echo b"))
                .then(append("c\n")),
        )
        .await?;
    timeout(Duration::from_secs(10), sequencer.wait()).await??;

    assert_eq!(std::fs::read_to_string(&results)?, "a\nb\nc\n");
    Ok(())
}

#[tokio::test]
async fn process_output_is_added_after_existing_file_content() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let listing = dir.path().join("listing.txt");
    std::fs::write(&listing, "old\n")?;

    let fs = Arc::new(RealFileSystem);
    let sink = Box::new(FileSink::new(dir.path().join("results.txt"), fs.clone()));
    let sequencer = Sequencer::start(batch_options(), sink, fs);

    sequencer
        .handle()
        .submit_chain(
            Chain::new()
                .then(Task::external_process_to_file("printf 'x\\ny\\n'", &listing))
                .then(Task::external_process_to_file("echo z", &listing)),
        )
        .await?;
    timeout(Duration::from_secs(10), sequencer.wait()).await??;

    assert_eq!(std::fs::read_to_string(&listing)?, "old\nx\ny\nz\n");
    Ok(())
}

#[tokio::test]
async fn starting_a_process_kills_the_previous_one() -> TestResult {
    init_tracing();

    let (event_tx, mut event_rx) = mpsc::channel::<SchedulerEvent>(32);
    let runner = spawn_runner(event_tx);

    let first = ProcessId(1);
    let second = ProcessId(2);
    runner
        .send(RunnerRequest::Start(ProcessRequest {
            id: first,
            command: "sleep 5; echo first".to_string(),
        }))
        .await?;
    sleep(Duration::from_millis(50)).await;
    runner
        .send(RunnerRequest::Start(ProcessRequest {
            id: second,
            command: "echo second".to_string(),
        }))
        .await?;

    let mut seen = Vec::new();
    let finished = timeout(Duration::from_secs(5), async {
        while let Some(event) = event_rx.recv().await {
            match event {
                SchedulerEvent::ProcessOutput { id, chunk } => seen.push((id, chunk)),
                SchedulerEvent::ProcessExited { id, outcome } => {
                    seen.push((id, format!("exit {outcome:?}")));
                    if id == second {
                        break;
                    }
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    })
    .await;
    assert!(finished.is_ok(), "second process never exited");

    assert_eq!(
        seen,
        vec![
            (second, "second\n".to_string()),
            (second, "exit Success".to_string()),
        ]
    );

    // The killed process never reports.
    sleep(Duration::from_millis(200)).await;
    assert!(event_rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn failing_command_reports_its_exit_code() -> TestResult {
    init_tracing();

    let (event_tx, mut event_rx) = mpsc::channel::<SchedulerEvent>(32);
    let runner = spawn_runner(event_tx);

    runner
        .send(RunnerRequest::Start(ProcessRequest {
            id: ProcessId(7),
            command: "echo oops >&2; exit 3".to_string(),
        }))
        .await?;

    let mut output = String::new();
    let outcome = timeout(Duration::from_secs(5), async {
        loop {
            match event_rx.recv().await {
                Some(SchedulerEvent::ProcessOutput { chunk, .. }) => output.push_str(&chunk),
                Some(SchedulerEvent::ProcessExited { outcome, .. }) => return Some(outcome),
                Some(_) => {}
                None => return None,
            }
        }
    })
    .await?;

    assert_eq!(outcome, Some(ProcessOutcome::Failed(3)));
    assert_eq!(output, "oops\n");
    Ok(())
}

#[tokio::test]
async fn kill_for_a_stale_id_leaves_the_live_process_alone() -> TestResult {
    init_tracing();

    let (event_tx, mut event_rx) = mpsc::channel::<SchedulerEvent>(32);
    let runner = spawn_runner(event_tx);

    runner
        .send(RunnerRequest::Start(ProcessRequest {
            id: ProcessId(2),
            command: "sleep 0.2; echo done".to_string(),
        }))
        .await?;
    runner.send(RunnerRequest::Kill(ProcessId(1))).await?;

    let exited = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(SchedulerEvent::ProcessExited { id, outcome }) = event_rx.recv().await {
                return (id, outcome);
            }
        }
    })
    .await?;

    assert_eq!(exited, (ProcessId(2), ProcessOutcome::Success));
    Ok(())
}
