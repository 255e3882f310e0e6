//! Stopping the workers of a build once one of them has failed.

use anyhow::Result;
use futures::{StreamExt, stream};
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
use tilepress_core::PyramidError;

/// A flag shared by every task of a build.
///
/// Blocking workers cannot be aborted from the outside, so they poll the flag
/// between units of work (tiles, batches) and give up with
/// [`PyramidError::Cancelled`] once it is set.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
	pub fn new() -> Cancellation {
		Cancellation::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// # Errors
	///
	/// [`PyramidError::Cancelled`] once [`Cancellation::cancel`] was called.
	pub fn check(&self) -> Result<(), PyramidError> {
		if self.is_cancelled() {
			Err(PyramidError::Cancelled)
		} else {
			Ok(())
		}
	}
}

fn is_cancelled(error: &anyhow::Error) -> bool {
	matches!(error.downcast_ref::<PyramidError>(), Some(PyramidError::Cancelled))
}

/// Runs `tasks` with at most `limit` of them in flight and collects their
/// results in completion order.
///
/// The first failure cancels `cancellation`. Unlike `try_collect` this keeps
/// polling until every task has finished, so no blocking work is still
/// running when the call returns.
///
/// # Errors
///
/// The first error that is not [`PyramidError::Cancelled`], or the first
/// error at all if every failure was a cancellation.
pub async fn run_to_completion<T, F>(
	tasks: impl IntoIterator<Item = F>,
	limit: usize,
	cancellation: &Cancellation,
) -> Result<Vec<T>>
where
	F: Future<Output = Result<T>>,
{
	let mut results = stream::iter(tasks).buffer_unordered(limit.max(1));
	let mut values = Vec::new();
	let mut failure: Option<anyhow::Error> = None;

	while let Some(result) = results.next().await {
		match result {
			Ok(value) => values.push(value),
			Err(error) => {
				cancellation.cancel();
				match &failure {
					Some(first) if !is_cancelled(first) || is_cancelled(&error) => {
						log::trace!("ignoring later failure: {error:#}");
					}
					_ => failure = Some(error),
				}
			}
		}
	}

	match failure {
		Some(error) => Err(error),
		None => Ok(values),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::bail;
	use pretty_assertions::assert_eq;
	use std::{
		sync::atomic::AtomicUsize,
		time::{Duration, Instant},
	};

	#[test]
	fn flag_is_shared_by_clones() {
		let cancellation = Cancellation::new();
		let copy = cancellation.clone();
		assert!(copy.check().is_ok());
		cancellation.cancel();
		assert!(copy.is_cancelled());
		assert_eq!(copy.check(), Err(PyramidError::Cancelled));
	}

	#[tokio::test]
	async fn collects_every_result() -> Result<()> {
		let tasks = (0..10).map(|i| async move { Ok(i * 2) });
		let mut values = run_to_completion(tasks, 3, &Cancellation::new()).await?;
		values.sort_unstable();
		assert_eq!(values, (0..10).map(|i| i * 2).collect::<Vec<_>>());
		Ok(())
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn waits_for_running_tasks_after_a_failure() {
		let cancellation = Cancellation::new();
		let finished = Arc::new(AtomicUsize::new(0));
		let skipped = Arc::new(AtomicUsize::new(0));

		let tasks = (0..8).map(|i| {
			let cancellation = cancellation.clone();
			let finished = Arc::clone(&finished);
			let skipped = Arc::clone(&skipped);
			async move {
				if cancellation.is_cancelled() {
					skipped.fetch_add(1, Ordering::SeqCst);
				}
				cancellation.check()?;
				tokio::task::spawn_blocking(move || {
					if i == 0 {
						bail!("task {i} failed");
					}
					let start = Instant::now();
					while start.elapsed() < Duration::from_millis(100) && !cancellation.is_cancelled() {
						std::thread::sleep(Duration::from_millis(5));
					}
					std::thread::sleep(Duration::from_millis(20));
					finished.fetch_add(1, Ordering::SeqCst);
					Ok(())
				})
				.await?
			}
		});

		let error = run_to_completion(tasks, 2, &cancellation).await.unwrap_err();
		assert_eq!(error.to_string(), "task 0 failed");
		assert!(cancellation.is_cancelled());
		// task 1 started next to task 0 and was waited for
		assert_eq!(finished.load(Ordering::SeqCst), 1);
		assert_eq!(skipped.load(Ordering::SeqCst), 6);
	}

	#[tokio::test]
	async fn real_failure_wins_over_cancellation() {
		let cancellation = Cancellation::new();
		let tasks = [true, false].map(|cancelled| async move {
			if cancelled {
				Err(PyramidError::Cancelled.into())
			} else {
				Err::<(), _>(anyhow::anyhow!("disk full"))
			}
		});
		let error = run_to_completion(tasks, 1, &cancellation).await.unwrap_err();
		assert_eq!(error.to_string(), "disk full");
	}
}
