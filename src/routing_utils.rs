use crate::domain;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};
use serde::Serialize;
use tracing::error;
use utoipa::openapi::{RefOr, Schema};
use utoipa::{ToResponse, ToSchema, openapi};
use validator::ValidationErrors;

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToResponse)]
#[response(examples(
    ("Not Found" = (
        summary = "Team, user, member, or task could not be found (404)",
        value = json!({
            "error_code": "not_found",
            "error_description": "Could not find team 12.",
            "extra_info": null
        })
    )),

    ("Forbidden" = (
        summary = "The acting user's role doesn't allow the operation (403)",
        value = json!({
            "error_code": "forbidden",
            "error_description": "only the team admin can add members",
            "extra_info": null
        })
    )),

    ("Conflict" = (
        summary = "The change would duplicate a membership or break the single-admin rule (409)",
        value = json!({
            "error_code": "conflict",
            "error_description": "jdoe is already a member of this team",
            "extra_info": null
        })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({
            "error_code": "internal_error",
            "error_description": "Could not access data to complete your request",
            "extra_info": null
        })
    )),

    ("Invalid Input" = (
        summary = "Invalid request body was passed (400)",
        value = json!({
            "error_code": "invalid_input",
            "error_description": "Submitted data was invalid.",
            "extra_info": {
                "title": [
                    {
                        "code": "length",
                        "message": null,
                        "params": {
                            "value": "",
                            "min": 1
                        }
                    }
                ]
            }
        })
    )),

    ("Malformed JSON" = (
        summary = "Invalid JSON passed to server (400)",
        value = json!({
            "error_code": "invalid_json",
            "error_description": "The passed request body contained malformed or unreadable JSON.",
            "extra_info": "Failed to parse the request body as JSON: EOF while parsing an object at line 4 column 0"
        })
    ))
))]
pub struct BasicErrorResponse {
    pub error_code: String,
    pub error_description: String,
    pub extra_info: Option<ExtraInfo>,
}

impl BasicErrorResponse {
    fn without_extra_info(error_code: &str, error_description: impl Into<String>) -> Self {
        BasicErrorResponse {
            error_code: error_code.to_owned(),
            error_description: error_description.into(),
            extra_info: None,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

/// Response type that turns domain errors into [BasicErrorResponse]s with a matching status code
pub struct DomainErrorResponse(pub domain::Error);

impl IntoResponse for DomainErrorResponse {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            domain::Error::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                BasicErrorResponse::without_extra_info("invalid_input", message),
            ),
            domain::Error::NotPermitted(message) => (
                StatusCode::FORBIDDEN,
                BasicErrorResponse::without_extra_info("forbidden", message),
            ),
            domain::Error::DoesNotExist(missing) => (
                StatusCode::NOT_FOUND,
                BasicErrorResponse::without_extra_info(
                    "not_found",
                    format!("Could not find {missing}."),
                ),
            ),
            domain::Error::Conflict(message) => (
                StatusCode::CONFLICT,
                BasicErrorResponse::without_extra_info("conflict", message),
            ),
            domain::Error::PortError(cause) => {
                error!("Request failed on a driven port: {cause:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    BasicErrorResponse::without_extra_info(
                        "internal_error",
                        "Could not access data to complete your request",
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<domain::Error> for DomainErrorResponse {
    fn from(value: domain::Error) -> Self {
        Self(value)
    }
}

/// Response type for failures with no more specific meaning than "something broke"
pub struct GenericErrorResponse(pub anyhow::Error);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        error!("Unexpected failure: {:#}", self.0);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(BasicErrorResponse::without_extra_info(
                "internal_error",
                "Could not access data to complete your request",
            )),
        )
            .into_response()
    }
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(BasicErrorResponse {
                error_code: "invalid_input".into(),
                error_description: "Submitted data was invalid.".to_owned(),
                extra_info: Some(ExtraInfo::ValidationIssues(ValidationErrorSchema(self.0))),
            }),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(BasicErrorResponse {
                error_code: "invalid_json".into(),
                error_description:
                    "The passed request body contained malformed or unreadable JSON.".into(),
                extra_info: Some(ExtraInfo::Message(self.parse_problem)),
            }),
        )
            .into_response()
    }
}

/// Wrapper for [axum::extract::Query] which reports unparseable query strings the same way
/// other bad input is reported
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(QueryErrorResponse))]
pub struct Query<T>(pub T);

/// Response type representing query string parse errors
pub struct QueryErrorResponse {
    parse_problem: String,
}

impl From<QueryRejection> for QueryErrorResponse {
    fn from(value: QueryRejection) -> Self {
        QueryErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for QueryErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(BasicErrorResponse {
                error_code: "invalid_input".into(),
                error_description: "The query string could not be read.".into(),
                extra_info: Some(ExtraInfo::Message(self.parse_problem)),
            }),
        )
            .into_response()
    }
}
