//! Workload units: the pure computations a task performs once per release
//!
//! Four units of deliberately different character: a constant-time marker,
//! a floating-point unit conversion, a wide integer multiplication, and a
//! bounded binary search. Each is side-effect free; the executive logs the
//! outcome after the owning task's release completes.

use core::fmt;

/// Fahrenheit input for the conversion unit.
pub const FAHRENHEIT_INPUT: f32 = 100.0;

/// Left operand of the wide multiplication unit.
pub const WIDE_LHS: u64 = 9_876_543_210;

/// Right operand of the wide multiplication unit.
pub const WIDE_RHS: u64 = 1_234_567_890;

/// The fixed product. Exceeds `i64::MAX`, so anything narrower than an
/// unsigned 64-bit integer silently wraps. The regression tests pin the
/// unit against this constant.
pub const WIDE_PRODUCT: u64 = 12_193_263_111_263_526_900;

/// Target the search unit must locate on every release.
pub const SEARCH_TARGET: i32 = 25;

const fn ascending(start: i32) -> [i32; 50] {
    let mut xs = [0i32; 50];
    let mut i = 0;
    while i < xs.len() {
        xs[i] = start + i as i32;
        i += 1;
    }
    xs
}

/// Fixed dataset for the search unit: 1..=50, ascending.
pub static SEARCH_SPACE: [i32; 50] = ascending(1);

/// Convert a Fahrenheit temperature to Celsius.
pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Multiply two integers whose product is known to fit a `u64`.
///
/// The width is the point: the fixed operands produce a value above
/// `i64::MAX`, and a platform-dependent `long`-sized type would wrap
/// without a sound. Callers supply operands whose product fits.
pub fn wide_multiply(lhs: u64, rhs: u64) -> u64 {
    lhs * rhs
}

/// Result of one binary search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Search {
    /// Index of the target, if present.
    pub position: Option<usize>,
    /// Comparisons performed; bounded by ceil(log2(len)) + 1.
    pub probes: u32,
}

/// Iterative closed-bounds binary search over an ascending slice.
pub fn binary_search(sorted: &[i32], target: i32) -> Search {
    binary_search_observed(sorted, target, |_, _| {})
}

/// [`binary_search`] with a per-probe observer receiving the candidate
/// range `(low, high)` before each comparison. The range narrows strictly
/// monotonically; the observer exists so tests can assert that.
pub fn binary_search_observed(
    sorted: &[i32],
    target: i32,
    mut observe: impl FnMut(usize, usize),
) -> Search {
    let mut probes = 0u32;
    let mut low: isize = 0;
    let mut high: isize = sorted.len() as isize - 1;

    while low <= high {
        let mid = ((low + high) / 2) as usize;
        probes += 1;
        observe(low as usize, high as usize);

        if sorted[mid] == target {
            return Search {
                position: Some(mid),
                probes,
            };
        } else if sorted[mid] < target {
            low = mid as isize + 1;
        } else {
            high = mid as isize - 1;
        }
    }

    // Exits with low > high: the target is absent.
    Search {
        position: None,
        probes,
    }
}

/// A task's workload unit, selected at registration and immutable after.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Workload {
    /// Emit a fixed marker string; no computation.
    Marker(&'static str),
    /// Convert a fixed Fahrenheit value to Celsius.
    Convert { fahrenheit: f32 },
    /// Multiply two fixed 64-bit-range integers.
    Multiply { lhs: u64, rhs: u64 },
    /// Search a fixed ascending dataset for a fixed target.
    Search {
        dataset: &'static [i32],
        target: i32,
    },
}

impl Workload {
    /// Execute the unit once and return its outcome.
    pub fn run(&self) -> WorkOutcome {
        match *self {
            Workload::Marker(text) => WorkOutcome::Marker(text),
            Workload::Convert { fahrenheit } => WorkOutcome::Converted {
                fahrenheit,
                celsius: fahrenheit_to_celsius(fahrenheit),
            },
            Workload::Multiply { lhs, rhs } => WorkOutcome::Product(wide_multiply(lhs, rhs)),
            Workload::Search { dataset, target } => match binary_search(dataset, target) {
                Search {
                    position: Some(position),
                    probes,
                } => WorkOutcome::Found { position, probes },
                Search {
                    position: None,
                    probes,
                } => WorkOutcome::Missing { probes },
            },
        }
    }
}

/// What a workload unit produced; formatted as the task's output line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkOutcome {
    Marker(&'static str),
    Converted { fahrenheit: f32, celsius: f32 },
    Product(u64),
    Found { position: usize, probes: u32 },
    Missing { probes: u32 },
}

impl fmt::Display for WorkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WorkOutcome::Marker(text) => f.write_str(text),
            WorkOutcome::Converted {
                fahrenheit,
                celsius,
            } => write!(f, "Fahrenheit: {}, Celsius: {}", fahrenheit, celsius),
            WorkOutcome::Product(product) => write!(f, "Result: {}", product),
            WorkOutcome::Found { .. } => f.write_str("Element found"),
            WorkOutcome::Missing { .. } => f.write_str("Element not found"),
        }
    }
}
