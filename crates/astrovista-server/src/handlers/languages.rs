use axum::response::IntoResponse;

use crate::i18n::supported_languages;
use crate::response::PrettyJson;

/// GET /languages
pub async fn list_languages() -> impl IntoResponse {
    PrettyJson(supported_languages())
}
