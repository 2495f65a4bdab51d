use actix_web::error::{ErrorInternalServerError, ErrorNotFound};
use actix_web::http::header::CACHE_CONTROL;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use cogmosaic_core::service::{Response, ResponseStatus};
use cogmosaic_core::{MosaicError, MosaicResult};
use tracing::{debug, error};

use crate::config::file::srv::SrvConfig;

pub fn map_internal_error<T: std::fmt::Display>(e: T) -> actix_web::Error {
    error!("{e}");
    ErrorInternalServerError(e.to_string())
}

/// Turn the outcome of a service operation into an HTTP response.
///
/// `OK` is 200, `EMPTY` is 204 and `NOK` is 400 with the reason as text.
/// Unknown mosaics are 404, any other failure is 500.
/// `cache_control` is only added to successful responses.
pub fn respond(
    result: MosaicResult<Response>,
    cache_control: Option<&str>,
) -> ActixResult<HttpResponse> {
    let response = match result.or_else(MosaicError::into_response) {
        Ok(response) => response,
        Err(e @ MosaicError::NotFound(_)) => return Err(ErrorNotFound(e.to_string())),
        Err(e) => return Err(map_internal_error(e)),
    };
    Ok(match response.status {
        ResponseStatus::Ok => {
            let mut builder = HttpResponse::Ok();
            builder.content_type(response.content_type);
            if let Some(value) = cache_control {
                builder.insert_header((CACHE_CONTROL, value));
            }
            builder.body(response.body)
        }
        ResponseStatus::Empty => {
            debug!("No content: {}", response.text().unwrap_or_default());
            HttpResponse::NoContent().finish()
        }
        ResponseStatus::Nok => HttpResponse::BadRequest()
            .content_type(response.content_type)
            .body(response.body),
    })
}

/// Root of the tile URLs advertised to this client: the requested host plus the base path.
pub fn public_url(req: &HttpRequest, srv_config: &SrvConfig) -> String {
    let info = req.connection_info();
    format!(
        "{}://{}{}",
        info.scheme(),
        info.host(),
        srv_config.base_path.as_deref().unwrap_or_default()
    )
}
