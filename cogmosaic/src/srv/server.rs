use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use actix_web::http::header::CACHE_CONTROL;
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, middleware, route, web};
use cogmosaic_core::service::MosaicService;
use futures::TryFutureExt as _;
use tracing_actix_web::TracingLogger;

use crate::config::file::cors::CorsConfig;
use crate::config::file::srv::{KEEP_ALIVE_DEFAULT, LISTEN_ADDRESSES_DEFAULT, SrvConfig};
use crate::srv::mosaics::{
    get_geojson, get_info, get_mosaic_geojson, get_mosaic_info, get_mosaic_tilejson,
    get_tilejson, post_add, post_create,
};
use crate::srv::tiles::{get_mosaic_tile, get_tile};
use crate::{CogMosaicError, CogMosaicResult};

/// Largest accepted request body: MosaicJSON documents of large mosaics.
const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Return 200 OK if healthy. Used for readiness and liveness checks.
#[route("/health", method = "GET", method = "HEAD")]
#[allow(clippy::unused_async)]
async fn get_health() -> impl Responder {
    HttpResponse::Ok()
        .insert_header((CACHE_CONTROL, "no-cache"))
        .message_body("OK")
}

#[route("/favicon.ico", method = "GET", method = "HEAD")]
#[allow(clippy::unused_async)]
async fn get_favicon() -> impl Responder {
    HttpResponse::NoContent().finish()
}

pub fn router(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_BODY_SIZE))
        .service(get_health)
        .service(get_favicon)
        .service(post_create)
        .service(post_add)
        .service(get_info)
        .service(get_geojson)
        .service(get_tilejson)
        .service(get_mosaic_info)
        .service(get_mosaic_geojson)
        .service(get_mosaic_tilejson)
        .service(get_tile)
        .service(get_mosaic_tile);
}

type Server = Pin<Box<dyn Future<Output = CogMosaicResult<()>>>>;

/// Create a future for an Actix web server together with the listening address.
pub fn new_server(
    config: SrvConfig,
    service: MosaicService,
) -> CogMosaicResult<(Server, String)> {
    let keep_alive = Duration::from_secs(config.keep_alive.unwrap_or(KEEP_ALIVE_DEFAULT));
    let worker_processes = config.worker_processes.unwrap_or_else(num_cpus::get);
    let listen_addresses = config
        .listen_addresses
        .clone()
        .unwrap_or_else(|| LISTEN_ADDRESSES_DEFAULT.to_string());

    let cors_config = config.cors.clone().unwrap_or(CorsConfig::SimpleFlag(false));
    cors_config.validate()?;
    cors_config.log_current_configuration();

    let factory = move || {
        let cors_middleware = cors_config.make_cors_middleware();

        App::new()
            .app_data(Data::new(service.clone()))
            .app_data(Data::new(config.clone()))
            .wrap(middleware::Condition::new(
                cors_middleware.is_some(),
                cors_middleware.unwrap_or_default(),
            ))
            .wrap(TracingLogger::default())
            .wrap(NormalizePath::new(TrailingSlash::MergeOnly))
            .configure(router)
    };

    let server = HttpServer::new(factory)
        .bind(listen_addresses.clone())
        .map_err(|e| CogMosaicError::BindingError(e, listen_addresses.clone()))?
        .keep_alive(keep_alive)
        .shutdown_timeout(0)
        .workers(worker_processes)
        .run()
        .err_into();

    Ok((Box::pin(server), listen_addresses))
}
