use actix_multipart::{form::MultipartFormConfig, MultipartError};
use actix_web::{
    web,
    http::StatusCode,
    ResponseError,
    HttpResponse,
    error::{JsonPayloadError, PathError, QueryPayloadError},
};

use crate::handlers::json_error::error_body;

/// Whole multipart body, including the form fields around the file.
const MULTIPART_TOTAL_LIMIT: usize = 12 * 1024 * 1024 + 64 * 1024;

/// Extractor failures answer with the same envelope as handler errors.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ExtractorError::from(err).into()
    }));
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ExtractorError::from(err).into()
    }));
    cfg.app_data(web::PathConfig::default().error_handler(|err, _req| {
        ExtractorError::from(err).into()
    }));
    cfg.app_data(
        MultipartFormConfig::default()
            .total_limit(MULTIPART_TOTAL_LIMIT)
            .error_handler(|err, _req| ExtractorError::from(err).into()),
    );
}

#[derive(Debug)]
pub struct ExtractorError {
    message: String,
    status: StatusCode,
}

impl std::fmt::Display for ExtractorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ExtractorError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status).json(error_body("BAD_REQUEST", &self.message))
    }
}

impl From<JsonPayloadError> for ExtractorError {
    fn from(err: JsonPayloadError) -> Self {
        ExtractorError {
            message: format!("JSON payload error: {}", err),
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl From<QueryPayloadError> for ExtractorError {
    fn from(err: QueryPayloadError) -> Self {
        ExtractorError {
            message: format!("Invalid query string: {}", err),
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl From<PathError> for ExtractorError {
    fn from(err: PathError) -> Self {
        ExtractorError {
            message: format!("Invalid path: {}", err),
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl From<MultipartError> for ExtractorError {
    fn from(err: MultipartError) -> Self {
        ExtractorError {
            message: format!("Invalid upload form: {}", err),
            status: StatusCode::BAD_REQUEST,
        }
    }
}
