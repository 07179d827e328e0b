// src/backend/script.rs

use std::sync::Arc;

use crate::config::model::{ChainConfig, StepConfig};
use crate::fs::FileSystem;
use crate::sink::SinkSelector;
use crate::task::{Chain, ExitAction, Task};

/// Build the chain described by a `[[chain]]` config table.
pub fn chain_from_config(cfg: &ChainConfig, fs: Arc<dyn FileSystem>) -> Chain {
    cfg.steps
        .iter()
        .enumerate()
        .map(|(idx, step)| task_from_step(&cfg.name, idx, step, &fs))
        .collect()
}

fn task_from_step(chain: &str, idx: usize, step: &StepConfig, fs: &Arc<dyn FileSystem>) -> Task {
    match step {
        StepConfig::Print { text } => {
            let text = text.clone();
            Task::plain(format!("{chain}[{idx}] print"), move || {
                println!("{text}");
                Ok(())
            })
        }
        StepConfig::Append { text } => {
            let text = text.clone();
            Task::in_sink(format!("{chain}[{idx}] append"), move |sink| {
                sink.append_text(&text);
                if !text.ends_with('\n') {
                    sink.append_text("\n");
                }
                Ok(())
            })
        }
        StepConfig::WriteFile { path, text } => {
            let fs = Arc::clone(fs);
            let path = path.clone();
            let text = text.clone();
            Task::plain(format!("{chain}[{idx}] write {}", path.display()), move || {
                fs.write(&path, text.as_bytes())
            })
        }
        StepConfig::Shell {
            cmd,
            to_file: Some(path),
            ..
        } => Task::external_process_to_file(cmd.clone(), path.clone()),
        StepConfig::Shell {
            cmd, discard: true, ..
        } => Task::external_process(cmd.clone(), SinkSelector::Scratch, ExitAction::Nothing),
        StepConfig::Shell { cmd, .. } => Task::external_process_to_sink(cmd.clone()),
        StepConfig::Persist => Task::in_sink(format!("{chain}[{idx}] persist"), |_| Ok(())),
    }
}

/// One-line description of a step, used by `--dry-run`.
pub fn describe_step(step: &StepConfig) -> String {
    match step {
        StepConfig::Print { text } => format!("print {text:?}"),
        StepConfig::Append { text } => format!("append {text:?} to sink"),
        StepConfig::WriteFile { path, .. } => format!("write {}", path.display()),
        StepConfig::Shell {
            cmd,
            to_file: Some(path),
            ..
        } => format!("shell `{cmd}` >> {}", path.display()),
        StepConfig::Shell {
            cmd, discard: true, ..
        } => format!("shell `{cmd}` (output discarded)"),
        StepConfig::Shell { cmd, .. } => format!("shell `{cmd}` -> sink"),
        StepConfig::Persist => "persist sink".to_string(),
    }
}
