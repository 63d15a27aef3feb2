//! Error types for entity parsing using snafu.
//!
//! Classification values arrive from the backend as open strings; the parse
//! routines here are the single place an unrecognized value is turned into a
//! typed error instead of leaking through as free text.

use snafu::Snafu;

/// Result type alias for entity parsing.
pub type Result<T, E = TypeError> = std::result::Result<T, E>;

/// Errors produced when mapping wire values into closed entity types.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum TypeError {
    /// An article classification value outside the closed set.
    #[snafu(display("unrecognized article action tag: {value:?}"))]
    UnknownActionTag {
        /// The offending wire value.
        value: String,
    },

    /// A user status value outside the closed set.
    #[snafu(display("unrecognized user status: {value:?}"))]
    UnknownUserStatus {
        /// The offending wire value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_offending_value() {
        let err = TypeError::UnknownActionTag { value: "boost".to_owned() };
        assert!(err.to_string().contains("boost"));
    }
}
