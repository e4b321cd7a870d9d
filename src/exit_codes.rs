//! Exit code constants for the agentry CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing records, config problems)
//! - 2: Validation failure (invalid input, record invariants, lifecycle misuse)
//! - 3: Model backend failure
//! - 4: Lock acquisition failure
//! - 5: Prompt template failure (not found or rendering)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, missing records, or configuration problems.
pub const USER_ERROR: i32 = 1;

/// Validation failure: invalid input or a rejected record/transition.
pub const VALIDATION_FAILURE: i32 = 2;

/// The model backend failed or timed out.
pub const BACKEND_FAILURE: i32 = 3;

/// Lock acquisition failure: an agent or store lock is held.
pub const LOCK_FAILURE: i32 = 4;

/// Prompt template could not be found or rendered.
pub const TEMPLATE_FAILURE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            VALIDATION_FAILURE,
            BACKEND_FAILURE,
            LOCK_FAILURE,
            TEMPLATE_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
