// Error handling macros
// Provides macros for simplified precondition checks

/// Return early with an error if a condition is not satisfied.
///
/// The error expression is converted with `Into`, so a crate-local error
/// can be returned from a function whose error type wraps it.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error:expr) => {
        if !($cond) {
            return Err(::core::convert::Into::into($error));
        }
    };
}
