//! Error codes for the Willow backend
//!
//! Codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Order errors
//! - 5xxx: Loyalty errors
//! - 6xxx: Menu errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a bare `u16` so clients can branch on it without parsing
/// the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// Missing or wrong admin bearer token
    NotAuthenticated = 1001,
    /// Telegram init data failed signature verification
    InitDataInvalid = 1004,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// No order line matched the menu
    OrderEmpty = 4007,
    /// ETA is not one of the accepted values
    InvalidEta = 4008,
    /// Table number is neither takeaway nor in range
    InvalidTable = 4009,
    /// Status transition not allowed from the current status
    InvalidTransition = 4010,

    // ==================== 5xxx: Loyalty ====================
    /// Payment method is not accepted
    PaymentInvalidMethod = 5003,
    /// Star balance lower than the reward cost
    NotEnoughStars = 5101,
    /// Reward key does not exist
    RewardNotFound = 5102,
    /// Loyalty user not found
    UserNotFound = 5103,

    // ==================== 6xxx: Menu ====================
    /// Menu has never been loaded and the feed is unreachable
    MenuUnavailable = 6001,
    /// Menu feed fetch or parse failed
    MenuFetchFailed = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the short client-facing message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "OK",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Missing required fields",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Unauthorized",
            ErrorCode::InitDataInvalid => "Invalid initData",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Invalid items or quantities",
            ErrorCode::InvalidEta => "Invalid ETA",
            ErrorCode::InvalidTable => "Invalid table number",
            ErrorCode::InvalidTransition => "Order status does not allow this action",

            // Loyalty
            ErrorCode::PaymentInvalidMethod => "Invalid payment method",
            ErrorCode::NotEnoughStars => "NOT_ENOUGH_STARS",
            ErrorCode::RewardNotFound => "Invalid reward key",
            ErrorCode::UserNotFound => "User not found",

            // Menu
            ErrorCode::MenuUnavailable => "Menu is currently unavailable",
            ErrorCode::MenuFetchFailed => "Could not fetch menu",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => ErrorCode::Success,
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            5 => ErrorCode::InvalidRequest,
            7 => ErrorCode::RequiredField,
            8 => ErrorCode::ValueOutOfRange,

            1001 => ErrorCode::NotAuthenticated,
            1004 => ErrorCode::InitDataInvalid,

            4001 => ErrorCode::OrderNotFound,
            4007 => ErrorCode::OrderEmpty,
            4008 => ErrorCode::InvalidEta,
            4009 => ErrorCode::InvalidTable,
            4010 => ErrorCode::InvalidTransition,

            5003 => ErrorCode::PaymentInvalidMethod,
            5101 => ErrorCode::NotEnoughStars,
            5102 => ErrorCode::RewardNotFound,
            5103 => ErrorCode::UserNotFound,

            6001 => ErrorCode::MenuUnavailable,
            6002 => ErrorCode::MenuFetchFailed,

            9001 => ErrorCode::InternalError,
            9005 => ErrorCode::ConfigError,

            _ => return Err(InvalidErrorCode(value)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::InitDataInvalid.code(), 1004);
        assert_eq!(ErrorCode::NotEnoughStars.code(), 5101);
        assert_eq!(ErrorCode::MenuUnavailable.code(), 6001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for code in [
            ErrorCode::RequiredField,
            ErrorCode::InvalidEta,
            ErrorCode::NotEnoughStars,
            ErrorCode::MenuFetchFailed,
            ErrorCode::ConfigError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
        assert_eq!(InvalidErrorCode(4242).to_string(), "invalid error code: 4242");
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::NotEnoughStars).unwrap();
        assert_eq!(json, "5101");
        let code: ErrorCode = serde_json::from_str("4008").unwrap();
        assert_eq!(code, ErrorCode::InvalidEta);
        assert!(serde_json::from_str::<ErrorCode>("4242").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::Success.to_string(), "E0000");
        assert_eq!(ErrorCode::OrderNotFound.to_string(), "E4001");
    }

    #[test]
    fn test_not_enough_stars_message_is_machine_readable() {
        assert_eq!(ErrorCode::NotEnoughStars.message(), "NOT_ENOUGH_STARS");
    }
}
