// src/backend/grep.rs

use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::backend::{shell_quote, SearchBackend, SearchRequest};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::task::{Chain, Task};

/// Search backend built on `find`, `xargs` and `grep -E`.
///
/// The chain it builds:
/// 1. header line into the result sink
/// 2. explicit files written to the source file, one per line
/// 3. one `find` per directory, its output added to the source file
/// 4. `grep` over every listed file, output into the result sink
/// 5. footer line into the result sink
#[derive(Debug, Clone)]
pub struct GrepBackend {
    fs: Arc<dyn FileSystem>,
}

impl GrepBackend {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl SearchBackend for GrepBackend {
    fn name(&self) -> &str {
        "grep"
    }

    fn required_tools(&self, request: &SearchRequest) -> Vec<&'static str> {
        let mut tools = vec!["grep", "xargs", "tr"];
        if !request.dirs.is_empty() {
            tools.push("find");
        }
        tools
    }

    fn build_chain(&self, request: &SearchRequest) -> Result<Chain> {
        Regex::new(&request.pattern)?;

        let pattern = request.pattern.clone();
        let mut chain = Chain::new().then(Task::in_sink("grep header", move |sink| {
            sink.append_text(&format!("-*- grep: {pattern} -*-\n"));
            Ok(())
        }));

        let fs = Arc::clone(&self.fs);
        let source = request.source_file.clone();
        let listing: String = request
            .files
            .iter()
            .map(|f| format!("{}\n", f.display()))
            .collect();
        chain.push(Task::plain("write file list", move || {
            fs.write(&source, listing.as_bytes())
        }));

        for dir in request.dirs.iter() {
            chain.push(Task::external_process_to_file(
                find_command(dir, &request.includes),
                request.source_file.clone(),
            ));
        }

        chain.push(Task::external_process_to_sink(grep_command(
            &request.pattern,
            &request.source_file,
        )));

        chain.push(Task::in_sink("grep footer", |sink| {
            sink.append_text("-*- grep finished -*-\n");
            Ok(())
        }));

        Ok(chain)
    }
}

fn find_command(dir: &Path, includes: &[String]) -> String {
    let mut cmd = format!("find {} -type f", shell_quote(&dir.display().to_string()));
    if !includes.is_empty() {
        let names: Vec<String> = includes
            .iter()
            .map(|glob| format!("-name {}", shell_quote(glob)))
            .collect();
        cmd.push_str(&format!(" \\( {} \\)", names.join(" -o ")));
    }
    cmd
}

fn grep_command(pattern: &str, source_file: &Path) -> String {
    format!(
        "tr '\\n' '\\000' < {} | xargs -0 grep -nH -E -e {} --",
        shell_quote(&source_file.display().to_string()),
        shell_quote(pattern)
    )
}
