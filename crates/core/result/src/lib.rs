#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

#[cfg(feature = "axum")]
pub mod axum;

/// Result type with custom Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error information
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Error {
    /// Type of error and additional information
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub error_type: ErrorType,

    /// Where this error occurred
    pub location: String,
}

/// Possible error types
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
#[derive(Debug, Clone)]
pub enum ErrorType {
    /// This error was not labeled :(
    LabelMe,

    // ? User related errors
    UnknownUser,
    UsernameTaken,
    InvalidUsername,
    CannotFollowYourself,

    // ? Report related errors
    UnknownReport,
    UnknownComment,
    UnknownReply,
    EmptyText,
    TextTooLong {
        max: usize,
    },
    MissingRequiredField {
        field: String,
    },

    // ? Media related errors
    TooManyImages {
        max: usize,
    },
    FileTooLarge {
        max: usize,
    },
    InvalidFileType,
    UploadCancelled,
    UploadFailed,

    // ? Enrichment related errors
    EnrichmentFailed,

    // ? Permission errors
    NotOwner,
    NotPrivileged,

    // ? General errors
    DatabaseError {
        operation: String,
        collection: String,
    },
    InternalError,
    InvalidOperation,
    InvalidCredentials,
    InvalidSession,
    NotAuthenticated,
    NotFound,
    NoEffect,
    FailedValidation {
        error: String,
    },
}

#[macro_export]
macro_rules! create_error {
    ( $error: ident $( $tt:tt )? ) => {
        $crate::Error {
            error_type: $crate::ErrorType::$error $( $tt )?,
            location: format!("{}:{}:{}", file!(), line!(), column!()),
        }
    };
}

#[macro_export]
macro_rules! create_database_error {
    ( $operation: expr, $collection: expr ) => {
        create_error!(DatabaseError {
            operation: $operation.to_string(),
            collection: $collection.to_string()
        })
    };
}

#[macro_export]
#[cfg(debug_assertions)]
macro_rules! query {
    ( $self: ident, $type: ident, $collection: expr, $($rest:expr),+ ) => {
        Ok($self.$type($collection, $($rest),+).await.unwrap())
    };
}

#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! query {
    ( $self: ident, $type: ident, $collection: expr, $($rest:expr),+ ) => {
        $self.$type($collection, $($rest),+).await
            .map_err(|_| create_database_error!(stringify!($type), $collection))
    };
}

#[cfg(test)]
mod tests {
    use crate::ErrorType;

    #[test]
    fn use_macro_to_construct_error() {
        let error = create_error!(UnknownReport);
        assert!(matches!(error.error_type, ErrorType::UnknownReport));
    }

    #[test]
    fn use_macro_to_construct_complex_error() {
        let error = create_error!(FileTooLarge { max: 5_242_880 });
        assert!(matches!(
            error.error_type,
            ErrorType::FileTooLarge { max: 5_242_880 }
        ));
    }
}
