use actix_multipart::form::MultipartForm;
use actix_web::{delete, get, http::{header, StatusCode}, post, web, HttpResponse};
use validator::Validate;

use crate::{
    entities::file::{
        ContentQuery, Disposition, FileCategory, FileDeletedResponse, FileListQuery,
        FileRecordResponse, FileUploadForm, IncomingFile,
    },
    errors::AppError,
    handlers::json_error::json_ok,
    use_cases::extractors::AuthUser,
    utils::{file_names::content_disposition, valid_uuid::valid_uuid},
    AppState,
};

#[post("/files")]
pub async fn upload_file(
    state: web::Data<AppState>,
    user: AuthUser,
    MultipartForm(form): MultipartForm<FileUploadForm>,
) -> Result<HttpResponse, AppError> {
    let category: FileCategory = form.file_type.0.parse().map_err(AppError::BadRequest)?;

    let incoming = match form.file {
        Some(temp) if temp.size > 0 => {
            let bytes = tokio::fs::read(temp.file.path())
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to read upload: {}", e)))?;
            Some(IncomingFile {
                bytes,
                content_type: temp.content_type.map(|m| m.essence_str().to_string()),
                file_name: temp.file_name,
            })
        }
        _ => None,
    };

    let record = state.file_handler.upload(&user.0, category, incoming).await?;
    Ok(json_ok(StatusCode::CREATED, FileRecordResponse::from(record)))
}

#[get("/files")]
pub async fn list_files(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<FileListQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    query.validate()?;

    let category = query
        .file_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::parse::<FileCategory>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let records = state
        .file_handler
        .list(&user.0, category, query.limit, query.offset)
        .await?;

    let data: Vec<FileRecordResponse> = records.into_iter().map(FileRecordResponse::from).collect();
    Ok(json_ok(StatusCode::OK, data))
}

#[get("/files/{file_id}")]
pub async fn get_file(
    state: web::Data<AppState>,
    user: AuthUser,
    file_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let file_id = valid_uuid(&file_id)?;
    let record = state.file_handler.get(&user.0, &file_id).await?;
    Ok(json_ok(StatusCode::OK, FileRecordResponse::from(record)))
}

#[get("/files/{file_id}/content")]
pub async fn get_file_content(
    state: web::Data<AppState>,
    user: AuthUser,
    file_id: web::Path<String>,
    query: web::Query<ContentQuery>,
) -> Result<HttpResponse, AppError> {
    let file_id = valid_uuid(&file_id)?;
    let content = state
        .file_handler
        .read_content(&user.0, &file_id, query.variant)
        .await?;

    let inline = content.disposition == Disposition::Inline;
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content.mime_type))
        .insert_header((header::CONTENT_DISPOSITION, content_disposition(inline, &content.file_name)))
        .insert_header((header::CACHE_CONTROL, "private, max-age=300"))
        .body(content.bytes))
}

#[delete("/files/{file_id}")]
pub async fn delete_file(
    state: web::Data<AppState>,
    user: AuthUser,
    file_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let file_id = valid_uuid(&file_id)?;
    state.file_handler.delete(&user.0, &file_id).await?;
    Ok(json_ok(StatusCode::OK, FileDeletedResponse { id: file_id, deleted: true }))
}
