use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("pre-flight check(s) failed: {}", .failed.join(", "))]
    CheckFailed { failed: Vec<String> },

    #[error("pre-flight check(s) warned: {}", .warned.join(", "))]
    WarningPresent { warned: Vec<String> },
}
