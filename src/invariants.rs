//! Runtime invariant checks with contract-test support
//!
//! Production code asserts invariants with [`check_invariant!`]; every check
//! is recorded per thread so tests can prove a scenario actually exercised
//! the invariants it claims to cover.
//!
//! ```rust,ignore
//! check_invariant!(
//!     self.enabled == self.stream.is_some(),
//!     STREAM_IFF_ENABLED,
//!     "CameraSession::enable"
//! );
//!
//! #[test]
//! fn contract_camera_lifecycle() {
//!     // ... drive the session ...
//!     contract_test("camera lifecycle", &[STREAM_IFF_ENABLED]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;

pub const STREAM_IFF_ENABLED: &str = "A stream handle is held if and only if the camera is enabled";
pub const TIMER_IFF_RECORDING: &str =
    "An auto-stop timer is armed if and only if a recording is active";
pub const SINGLE_RECORDING: &str = "At most one recording session is active";

thread_local! {
    static CHECKED: RefCell<HashSet<&'static str>> = RefCell::new(HashSet::new());
}

/// Check an invariant and record that it was checked.
///
/// Panics when the condition is false.
#[macro_export]
macro_rules! check_invariant {
    ($condition:expr, $invariant:expr) => {
        $crate::invariants::__check($condition, $invariant, None)
    };
    ($condition:expr, $invariant:expr, $context:expr) => {
        $crate::invariants::__check($condition, $invariant, Some($context))
    };
}

#[doc(hidden)]
pub fn __check(condition: bool, invariant: &'static str, context: Option<&str>) {
    CHECKED.with(|checked| {
        checked.borrow_mut().insert(invariant);
    });

    if !condition {
        panic!(
            "INVARIANT VIOLATION [{}]: {}",
            context.unwrap_or("unknown"),
            invariant
        );
    }
}

/// Panics unless every listed invariant was checked on this thread.
pub fn contract_test(name: &str, required: &[&str]) {
    let missing: Vec<&str> = CHECKED.with(|checked| {
        let checked = checked.borrow();
        required
            .iter()
            .copied()
            .filter(|invariant| !checked.contains(invariant))
            .collect()
    });

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: invariants never checked:\n  - {}",
            name,
            missing.join("\n  - ")
        );
    }
}

/// Forget every recorded check on this thread
pub fn clear_checked() {
    CHECKED.with(|checked| checked.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_invariants_satisfy_contract() {
        clear_checked();
        check_invariant!(true, SINGLE_RECORDING);
        contract_test("single", &[SINGLE_RECORDING]);
    }

    #[test]
    #[should_panic(expected = "CONTRACT FAILURE")]
    fn test_unchecked_invariant_fails_contract() {
        clear_checked();
        contract_test("missing", &[TIMER_IFF_RECORDING]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [unit]")]
    fn test_violation_panics() {
        check_invariant!(false, STREAM_IFF_ENABLED, "unit");
    }
}
