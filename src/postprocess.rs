use std::path::Path;
use std::process::Command;

/// Compresses and indexes the filtered VCF with the external `bgzip` and
/// `tabix` utilities.
///
/// This is a terminal post-processing hook the core does not depend on:
/// missing binaries or nonzero exits are logged and swallowed, never
/// surfaced as run failures.
pub fn compress_and_index(vcf_path: &Path) {
    if !run_tool("bgzip", &["-f"], vcf_path) {
        return;
    }

    let compressed = format!("{}.gz", vcf_path.display());
    run_tool("tabix", &["-f", "-p", "vcf"], Path::new(&compressed));
}

fn run_tool(tool: &str, args: &[&str], target: &Path) -> bool {
    let mut command = Command::new(tool);
    command.args(args).arg(target);

    match command.status() {
        Ok(status) if status.success() => {
            tracing::info!(tool, target = %target.display(), "post-processing step complete");
            true
        }
        Ok(status) => {
            tracing::warn!(tool, %status, target = %target.display(), "post-processing step failed");
            false
        }
        Err(e) => {
            tracing::warn!(tool, error = %e, "post-processing tool unavailable, skipping");
            false
        }
    }
}
