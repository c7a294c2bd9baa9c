use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::reject::Reject;

/// Error kinds surfaced to api clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl HtmlError {
    pub fn code(&self) -> StatusCode {
        match self {
            HtmlError::InvalidRequest => StatusCode::BAD_REQUEST,
            HtmlError::Unauthorized => StatusCode::UNAUTHORIZED,
            HtmlError::Forbidden => StatusCode::FORBIDDEN,
            HtmlError::NotFound => StatusCode::NOT_FOUND,
            HtmlError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
            fields: BTreeMap::new(),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::Forbidden => "You do not have permission to perform this action.",
            HtmlError::NotFound => "Not found.",
            HtmlError::InternalServerError => "Internal server error.",
        };
        self.new(info)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("[{code}] {}", .info.as_deref().unwrap_or_default())]
pub struct Error {
    pub code: StatusCode,
    pub info: Option<String>,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl Error {
    /// Validation failure attached to a single payload field.
    pub fn field(field: &str, message: &str) -> Self {
        HtmlError::InvalidRequest.default().with_field(field, message)
    }

    pub fn with_field(mut self, field: &str, message: &str) -> Self {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
        self
    }

    pub fn is(&self, kind: HtmlError) -> bool {
        self.code == kind.code()
    }

    /// JSON body rendered for the client.
    pub fn body(&self) -> Value {
        if !self.fields.is_empty() {
            return json!(self.fields);
        }

        let info = self.info.as_deref().unwrap_or_default();
        match self.code {
            StatusCode::BAD_REQUEST => json!({ "errors": info }),
            StatusCode::INTERNAL_SERVER_ERROR => json!({ "detail": "Internal server error." }),
            _ => json!({ "detail": info }),
        }
    }
}

impl Reject for Error {}

#[derive(Debug)]
pub enum QueryError {
    Conflict(Option<String>),
    Failure(String),
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self::Failure(info)
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::Conflict(e.constraint().map(str::to_string))
            }
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::Conflict(constraint) => conflict(constraint.as_deref()),
            QueryError::Failure(info) => HtmlError::InternalServerError.new(&info),
        }
    }
}

/// Maps a violated unique constraint to the message clients see.
pub fn conflict(constraint: Option<&str>) -> Error {
    match constraint {
        Some("unique_user_email") => Error::field("email", "A user with that email already exists."),
        Some("unique_user_username") => {
            Error::field("username", "A user with that username already exists.")
        }
        Some("unique_recipe_author_name") => {
            HtmlError::InvalidRequest.new("You already have a recipe with this name.")
        }
        Some("unique_tag_name") | Some("unique_tag_slug") => {
            HtmlError::InvalidRequest.new("Tag already exists.")
        }
        Some("unique_ingredient") => HtmlError::InvalidRequest.new("Ingredient already exists."),
        _ => HtmlError::InvalidRequest.new("Object already exists."),
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
