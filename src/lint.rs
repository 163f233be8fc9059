use crate::errors::{Result, WorkflowError};
use std::path::Path;
use std::process::Command;

/// The project's lint/auto-fix task. Compiled in, like the reviewer list.
const LINT_PROGRAM: &str = "./gradlew";
const LINT_ARGS: &[&str] = &["ktlintFormat"];

/// Run the lint task in the work directory, streaming its output to the
/// terminal. A non-zero exit aborts the run with the task's own exit code.
pub fn run(workdir: &Path) -> Result<()> {
    log::info!("Running lint: {} {}", LINT_PROGRAM, LINT_ARGS.join(" "));

    let status = Command::new(LINT_PROGRAM)
        .args(LINT_ARGS)
        .current_dir(workdir)
        .status()?;

    if !status.success() {
        return Err(WorkflowError::Lint(status.code().unwrap_or(1)));
    }
    Ok(())
}
