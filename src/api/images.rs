//! Serves uploaded product images

use super::{AppState, Path};
use crate::errors::{Error, Result};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

/// GET /api/image/{file}, where `file` is `<name>.<ext>` for any stored image type
pub async fn serve(State(state): State<AppState>, Path(file): Path<String>) -> Result<impl IntoResponse> {
    let (name, extension) = file
        .rsplit_once('.')
        .ok_or_else(|| Error::not_found("Image", &file))?;
    let (bytes, content_type) = state.media.read(name, extension).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
