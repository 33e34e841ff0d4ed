//! Status lines and workspace notices.

use std::fmt;

use crate::workspace::{Notice, NoticeLevel};

/// One-line outcome of an operation that has no record to show.
pub struct OperationStatus {
    pub message: String,
    pub success: bool,
}

impl OperationStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", if self.success { "Success:" } else { "Error:" }, self.message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Info => write!(f, "{}", self.message),
            NoticeLevel::Error => write!(f, "⚠ {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_status_display() {
        assert_eq!(OperationStatus::success("Done").to_string(), "Success: Done\n");
        assert!(OperationStatus::failure("Nope").to_string().starts_with("Error:"));
    }

    #[test]
    fn test_notice_display() {
        assert_eq!(Notice::info("Saved").to_string(), "Saved");
        assert_eq!(Notice::error("Could not save").to_string(), "⚠ Could not save");
    }
}
