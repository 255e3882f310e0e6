use anyhow::{Result, bail};
use std::{
	ffi::OsStr,
	path::Path,
	process::{Command, Output},
};

/// Runs an external program to completion, failing on a non-zero exit with
/// the tail of its stderr in the message.
pub(crate) fn run<I, S>(program: &Path, args: I) -> Result<Output>
where
	I: IntoIterator<Item = S>,
	S: AsRef<OsStr>,
{
	let mut command = Command::new(program);
	command.args(args);
	log::trace!("running {command:?}");

	let output = match command.output() {
		Ok(output) => output,
		Err(error) => bail!("failed to run {}: {error}", program.display()),
	};

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr);
		let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
		bail!(
			"{} failed ({}): {}",
			program.display(),
			output.status,
			tail.into_iter().rev().collect::<Vec<_>>().join("; ")
		);
	}
	Ok(output)
}
