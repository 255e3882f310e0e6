//! Worker pool widths for the two parallel build phases.
//!
//! ```
//! use tilepress_core::ConcurrencyLimits;
//!
//! let limits = ConcurrencyLimits::default();
//! assert!(limits.levels >= 1);
//! assert!(limits.batches >= limits.levels);
//! ```

/// Upper bounds on simultaneously running build tasks.
///
/// Level tasks resample whole rasters and are CPU and memory heavy, so they
/// are capped at the CPU count. Compression batches mostly wait on external
/// processes and may run wider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
	/// Concurrent level rasterization tasks.
	pub levels: usize,
	/// Concurrent compression batches.
	pub batches: usize,
}

impl ConcurrencyLimits {
	/// Custom limits, each at least 1.
	pub fn new(levels: usize, batches: usize) -> Self {
		Self {
			levels: levels.max(1),
			batches: batches.max(1),
		}
	}

	/// Runs both phases with the same width.
	pub fn uniform(workers: usize) -> Self {
		Self::new(workers, workers)
	}

	/// Get the number of logical CPUs available
	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	/// - levels: 1x CPU count
	/// - batches: 1.5x CPU count
	fn default() -> Self {
		let cpus = Self::cpu_count();
		Self::new(cpus, cpus + (cpus / 2))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_limits() {
		let limits = ConcurrencyLimits::default();
		let cpus = num_cpus::get();

		assert_eq!(limits.levels, cpus);
		assert_eq!(limits.batches, cpus + (cpus / 2));
	}

	#[test]
	fn custom_limits() {
		assert_eq!(ConcurrencyLimits::new(4, 8), ConcurrencyLimits { levels: 4, batches: 8 });
		assert_eq!(ConcurrencyLimits::uniform(3), ConcurrencyLimits { levels: 3, batches: 3 });
	}

	#[test]
	fn limits_minimum_one() {
		assert_eq!(ConcurrencyLimits::new(0, 0), ConcurrencyLimits { levels: 1, batches: 1 });
	}

	#[test]
	fn cpu_count() {
		assert!(ConcurrencyLimits::cpu_count() >= 1);
	}
}
