//! Report hook: external commands run after a successful signal pass.

use std::path::Path;
use std::process::Command;

use openrisk_core::errors::PipelineError;

/// Environment variable carrying the store path to report commands.
pub const REPORT_DB_ENV: &str = "OPENRISK_DB";

/// Run each argv list in order. A command that cannot start or exits
/// non-zero aborts the hook. Returns the number of commands run.
pub fn run_report_commands(commands: &[Vec<String>], store: Option<&Path>) -> Result<usize, PipelineError> {
    if commands.is_empty() {
        tracing::info!("no report commands configured, skipping");
        return Ok(0);
    }

    for argv in commands {
        let Some((program, args)) = argv.split_first() else {
            tracing::warn!("empty report command ignored");
            continue;
        };
        let rendered = argv.join(" ");
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(path) = store {
            cmd.env(REPORT_DB_ENV, path);
        }

        tracing::info!(command = %rendered, "running report command");
        let status = cmd.status().map_err(|e| PipelineError::Report {
            command: rendered.clone(),
            message: e.to_string(),
        })?;
        if !status.success() {
            return Err(PipelineError::Report {
                command: rendered,
                message: format!("exited with {status}"),
            });
        }
    }
    Ok(commands.iter().filter(|c| !c.is_empty()).count())
}
