// tests/property_queue.rs

mod common;

use common::Harness;
use proptest::prelude::*;

use taskseq::engine::DequeueState;
use taskseq::sink::SinkSelector;
use taskseq::task::{Chain, ExitAction, Task};

const MAX_IN_FLIGHT: usize = 2;

#[derive(Debug, Clone, Copy)]
enum Step {
    Sync { fails: bool },
    /// External process; its exit action records the entry.
    Async,
}

/// One submission: its steps, whether it goes through the admission gate,
/// and what the harness does before the next submission.
#[derive(Debug, Clone)]
struct Submission {
    steps: Vec<Step>,
    top_level: bool,
    ticks_after: usize,
    exit_after: bool,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<bool>().prop_map(|fails| Step::Sync { fails }),
        Just(Step::Async),
    ]
}

fn submission_strategy() -> impl Strategy<Value = Submission> {
    (
        proptest::collection::vec(step_strategy(), 0..5),
        any::<bool>(),
        0..4usize,
        any::<bool>(),
    )
        .prop_map(|(steps, top_level, ticks_after, exit_after)| Submission {
            steps,
            top_level,
            ticks_after,
            exit_after,
        })
}

fn build_chain(h: &Harness, i: usize, steps: &[Step]) -> (Chain, Vec<String>) {
    let mut entries = Vec::new();
    let chain = steps
        .iter()
        .enumerate()
        .map(|(j, step)| {
            let entry = format!("{i}.{j}");
            entries.push(entry.clone());
            match step {
                Step::Sync { fails: true } => h.trace.failing_task(&entry),
                Step::Sync { fails: false } => h.trace.task(&entry),
                Step::Async => {
                    let trace = h.trace.clone();
                    Task::external_process(
                        format!("cmd {entry}"),
                        SinkSelector::Scratch,
                        ExitAction::custom(move |_| {
                            trace.record(entry);
                            Ok(())
                        }),
                    )
                }
            }
        })
        .collect();
    (chain, entries)
}

fn check_invariants(h: &Harness) -> Result<(), TestCaseError> {
    let queue = h.core.queue();
    if queue.is_empty() {
        prop_assert!(queue.epilogue_positions().is_empty());
    } else {
        prop_assert_eq!(queue.epilogue_positions(), vec![queue.len() - 1]);
    }
    prop_assert!(h.core.in_flight() <= MAX_IN_FLIGHT);
    if let DequeueState::AwaitingExit { process } = h.core.dequeue_state() {
        prop_assert_eq!(h.pending_dequeue(), None);
        prop_assert_eq!(h.core.live_process(), Some(process));
    }
    Ok(())
}

proptest! {
    #[test]
    fn queue_keeps_epilogue_last_and_runs_fifo(
        submissions in proptest::collection::vec(submission_strategy(), 1..8)
    ) {
        let mut h = Harness::with_max_in_flight(MAX_IN_FLIGHT);
        let mut expected = Vec::new();

        for (i, sub) in submissions.iter().enumerate() {
            let (chain, entries) = build_chain(&h, i, &sub.steps);
            if sub.top_level {
                // A full gate rejects the whole chain; none of it may run.
                if h.submit(chain).is_ok() {
                    expected.extend(entries);
                }
            } else {
                h.follow_up(chain);
                expected.extend(entries);
            }
            check_invariants(&h)?;

            for _ in 0..sub.ticks_after {
                h.tick();
                check_invariants(&h)?;
            }
            if sub.exit_after {
                if let Some(id) = h.core.live_process() {
                    h.exit(id);
                    check_invariants(&h)?;
                }
            }
        }

        h.drain("");
        prop_assert_eq!(h.trace.snapshot(), expected);
        prop_assert!(h.core.is_idle());
        prop_assert_eq!(h.core.in_flight(), 0);
        prop_assert_eq!(h.core.live_process(), None);
    }
}
