use std::str::FromStr;

use actix_web::error::ErrorNotFound;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, middleware, route};
use cogmosaic_core::mosaic::{CreationParams, MosaicDefinition, MosaicId, MosaicRef};
use cogmosaic_core::service::{MAX_SCALE, MosaicService, Response, TileUrlOptions};
use cogmosaic_core::{MosaicError, MosaicResult};
use cogmosaic_tile_utils::TileFormat;
use serde::Deserialize;

use crate::config::file::srv::SrvConfig;
use crate::srv::{public_url, respond};

/// Query parameters in request order.
type QueryPairs = Vec<(String, String)>;

#[derive(Deserialize, Debug, Default)]
struct UrlQuery {
    url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct AddQuery {
    mosaicid: Option<String>,
}

/// Mosaic identifier of a path segment. Anything else is an unknown route.
pub(crate) fn path_id(segment: &str) -> ActixResult<MosaicId> {
    MosaicId::parse(segment).ok_or_else(|| ErrorNotFound(format!("Unknown mosaic {segment}")))
}

fn query_pairs(req: &HttpRequest) -> ActixResult<QueryPairs> {
    Ok(Query::<QueryPairs>::from_query(req.query_string())?.into_inner())
}

/// Remove the first value of `key`.
fn take(query: &mut QueryPairs, key: &str) -> Option<String> {
    let index = query.iter().position(|(k, _)| k == key)?;
    Some(query.remove(index).1)
}

fn parse_param<T: FromStr>(
    name: &'static str,
    value: Option<String>,
) -> MosaicResult<Option<T>> {
    value
        .map(|v| v.parse().map_err(|_| MosaicError::InvalidParameter(name, v)))
        .transpose()
}

fn parse_flag(name: &'static str, value: Option<String>) -> MosaicResult<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "0" => Ok(false),
        "true" | "1" => Ok(true),
        _ => Err(MosaicError::InvalidParameter(name, value)),
    }
}

/// Tile URL options from `tile_format` and `tile_scale`, all other parameters are passed on.
fn url_options(host: String, mut query: QueryPairs) -> MosaicResult<TileUrlOptions> {
    let mut options = TileUrlOptions::new(host);
    if let Some(format) = take(&mut query, "tile_format") {
        options.format = Some(
            TileFormat::parse(&format)
                .ok_or(MosaicError::InvalidParameter("tile_format", format))?,
        );
    }
    if let Some(scale) = parse_param::<u8>("tile_scale", take(&mut query, "tile_scale"))? {
        if !(1..=MAX_SCALE).contains(&scale) {
            return Err(MosaicError::InvalidParameter("tile_scale", scale.to_string()));
        }
        options.scale = scale;
    }
    options.query = query;
    Ok(options)
}

async fn create(
    service: &MosaicService,
    assets: Vec<String>,
    mut query: QueryPairs,
    host: String,
) -> MosaicResult<Response> {
    let mut params = CreationParams::new(assets);
    params.minzoom = parse_param("minzoom", take(&mut query, "minzoom"))?;
    params.maxzoom = parse_param("maxzoom", take(&mut query, "maxzoom"))?;
    params.min_tile_cover = parse_param("min_tile_cover", take(&mut query, "min_tile_cover"))?;
    if let Some(cover) = params.min_tile_cover
        && !(0.0..=1.0).contains(&cover)
    {
        return Err(MosaicError::InvalidParameter(
            "min_tile_cover",
            cover.to_string(),
        ));
    }
    params.tile_cover_sort = parse_flag("tile_cover_sort", take(&mut query, "tile_cover_sort"))?;
    let urls = url_options(host, query)?;
    service.create(&params, &urls).await
}

/// Create a mosaic from the JSON list of assets in the body, or describe the existing one.
#[route("/create", method = "POST", wrap = "middleware::Compress::default()")]
pub(crate) async fn post_create(
    req: HttpRequest,
    assets: Json<Vec<String>>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let query = query_pairs(&req)?;
    let host = public_url(&req, &srv_config);
    respond(create(&service, assets.into_inner(), query, host).await, None)
}

/// Store the MosaicJSON document in the body under `?mosaicid=`.
#[route("/add", method = "POST")]
pub(crate) async fn post_add(
    query: Query<AddQuery>,
    definition: Json<MosaicDefinition>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let result = match query.into_inner().mosaicid {
        None => Err(MosaicError::MissingParameter("mosaicid")),
        Some(value) => match MosaicId::parse(&value) {
            Some(id) => service.add(id, &definition).await,
            None => Err(MosaicError::InvalidParameter("mosaicid", value)),
        },
    };
    respond(result, None)
}

async fn info(
    service: &MosaicService,
    id: Option<MosaicId>,
    url: Option<String>,
) -> MosaicResult<Response> {
    let reference = MosaicRef::from_request(id, url)?;
    service.info(&reference, &mut rand::rng()).await
}

#[route(
    "/info",
    method = "GET",
    method = "HEAD",
    wrap = "middleware::Compress::default()"
)]
pub(crate) async fn get_info(
    query: Query<UrlQuery>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let result = info(&service, None, query.into_inner().url).await;
    respond(result, srv_config.cache_control.as_deref())
}

#[route(
    "/{mosaicid:[0-9A-Fa-f]+}/info",
    method = "GET",
    method = "HEAD",
    wrap = "middleware::Compress::default()"
)]
pub(crate) async fn get_mosaic_info(
    path: Path<String>,
    query: Query<UrlQuery>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let id = path_id(&path)?;
    let result = info(&service, Some(id), query.into_inner().url).await;
    respond(result, srv_config.cache_control.as_deref())
}

async fn geojson(
    service: &MosaicService,
    id: Option<MosaicId>,
    url: Option<String>,
) -> MosaicResult<Response> {
    let reference = MosaicRef::from_request(id, url)?;
    service.geojson(&reference).await
}

#[route(
    "/geojson",
    method = "GET",
    method = "HEAD",
    wrap = "middleware::Compress::default()"
)]
pub(crate) async fn get_geojson(
    query: Query<UrlQuery>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let result = geojson(&service, None, query.into_inner().url).await;
    respond(result, srv_config.cache_control.as_deref())
}

#[route(
    "/{mosaicid:[0-9A-Fa-f]+}/geojson",
    method = "GET",
    method = "HEAD",
    wrap = "middleware::Compress::default()"
)]
pub(crate) async fn get_mosaic_geojson(
    path: Path<String>,
    query: Query<UrlQuery>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let id = path_id(&path)?;
    let result = geojson(&service, Some(id), query.into_inner().url).await;
    respond(result, srv_config.cache_control.as_deref())
}

async fn tilejson(
    service: &MosaicService,
    id: Option<MosaicId>,
    mut query: QueryPairs,
    host: String,
) -> MosaicResult<Response> {
    let reference = MosaicRef::from_request(id, take(&mut query, "url"))?;
    let urls = url_options(host, query)?;
    service.tilejson(&reference, &urls).await
}

#[route(
    "/tilejson.json",
    method = "GET",
    method = "HEAD",
    wrap = "middleware::Compress::default()"
)]
pub(crate) async fn get_tilejson(
    req: HttpRequest,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let query = query_pairs(&req)?;
    let host = public_url(&req, &srv_config);
    let result = tilejson(&service, None, query, host).await;
    respond(result, srv_config.cache_control.as_deref())
}

#[route(
    "/{mosaicid:[0-9A-Fa-f]+}/tilejson.json",
    method = "GET",
    method = "HEAD",
    wrap = "middleware::Compress::default()"
)]
pub(crate) async fn get_mosaic_tilejson(
    req: HttpRequest,
    path: Path<String>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let id = path_id(&path)?;
    let query = query_pairs(&req)?;
    let host = public_url(&req, &srv_config);
    let result = tilejson(&service, Some(id), query, host).await;
    respond(result, srv_config.cache_control.as_deref())
}
