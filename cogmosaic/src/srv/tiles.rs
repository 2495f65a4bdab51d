use actix_web::web::{Data, Path, Query};
use actix_web::{HttpResponse, Result as ActixResult, route};
use cogmosaic_core::mosaic::{MosaicId, MosaicRef};
use cogmosaic_core::pixsel::PixelSelection;
use cogmosaic_core::reader::Resampling;
use cogmosaic_core::service::{MosaicService, Response, TileRequest};
use cogmosaic_core::{MosaicError, MosaicResult};
use cogmosaic_tile_utils::TileFormat;
use serde::Deserialize;

use crate::config::file::srv::SrvConfig;
use crate::srv::mosaics::path_id;
use crate::srv::respond;

#[derive(Deserialize, Debug, Default)]
struct TileQuery {
    url: Option<String>,
    pixel_selection: Option<String>,
    resampling_method: Option<String>,
}

#[route(
    r"/{z:\d+}/{x:\d+}/{y:\d+(@\d+x)?(\.\w+)?}",
    method = "GET",
    method = "HEAD"
)]
pub(crate) async fn get_tile(
    path: Path<(u8, u32, String)>,
    query: Query<TileQuery>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let (z, x, name) = path.into_inner();
    let result = render(&service, None, z, x, &name, query.into_inner()).await;
    respond(result, srv_config.cache_control.as_deref())
}

#[route(
    r"/{mosaicid:[0-9A-Fa-f]+}/{z:\d+}/{x:\d+}/{y:\d+(@\d+x)?(\.\w+)?}",
    method = "GET",
    method = "HEAD"
)]
pub(crate) async fn get_mosaic_tile(
    path: Path<(String, u8, u32, String)>,
    query: Query<TileQuery>,
    srv_config: Data<SrvConfig>,
    service: Data<MosaicService>,
) -> ActixResult<HttpResponse> {
    let (mosaicid, z, x, name) = path.into_inner();
    let id = path_id(&mosaicid)?;
    let result = render(&service, Some(id), z, x, &name, query.into_inner()).await;
    respond(result, srv_config.cache_control.as_deref())
}

async fn render(
    service: &MosaicService,
    id: Option<MosaicId>,
    z: u8,
    x: u32,
    name: &str,
    query: TileQuery,
) -> MosaicResult<Response> {
    let (y, scale, format) = parse_tile_name(name)?;
    let reference = MosaicRef::from_request(id, query.url)?;
    let mut request = TileRequest::new(reference, z, x, y)?.with_format(format);
    if let Some(scale) = scale {
        request = request.with_scale(scale)?;
    }
    if let Some(name) = query.pixel_selection {
        match PixelSelection::parse(&name) {
            Some(selection) => request = request.with_pixel_selection(selection),
            None => return Err(MosaicError::InvalidParameter("pixel_selection", name)),
        }
    }
    if let Some(name) = query.resampling_method {
        match Resampling::parse(&name) {
            Some(resampling) => request = request.with_resampling(resampling),
            None => return Err(MosaicError::InvalidParameter("resampling_method", name)),
        }
    }
    service.tile(&request).await
}

/// Split the last segment of a tile path, `{y}[@{scale}x][.{ext}]`,
/// into the row, the optional scale and the optional format.
pub fn parse_tile_name(name: &str) -> MosaicResult<(u32, Option<u8>, Option<TileFormat>)> {
    let (rest, format) = match name.split_once('.') {
        Some((rest, ext)) => match TileFormat::parse(ext) {
            Some(format) => (rest, Some(format)),
            None => return Err(MosaicError::InvalidParameter("format", ext.to_string())),
        },
        None => (name, None),
    };
    let (y, scale) = match rest.split_once('@') {
        Some((y, suffix)) => {
            let scale = suffix
                .strip_suffix('x')
                .and_then(|scale| scale.parse::<u8>().ok())
                .ok_or_else(|| MosaicError::InvalidParameter("scale", suffix.to_string()))?;
            (y, Some(scale))
        }
        None => (rest, None),
    };
    let y = y
        .parse()
        .map_err(|_| MosaicError::InvalidParameter("y", y.to_string()))?;
    Ok((y, scale, format))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("7", (7, None, None))]
    #[case("7@2x", (7, Some(2), None))]
    #[case("7.png", (7, None, Some(TileFormat::Png)))]
    #[case("7@3x.jpg", (7, Some(3), Some(TileFormat::Jpeg)))]
    #[case("0@1x.tif", (0, Some(1), Some(TileFormat::Tiff)))]
    #[case("12.pbf", (12, None, Some(TileFormat::Pbf)))]
    fn tile_names(#[case] name: &str, #[case] expected: (u32, Option<u8>, Option<TileFormat>)) {
        assert_eq!(parse_tile_name(name).unwrap(), expected);
    }

    #[rstest]
    #[case("7.gif", "format")]
    #[case("7@999x", "scale")]
    #[case("7@x", "scale")]
    #[case("99999999999", "y")]
    fn invalid_tile_names(#[case] name: &str, #[case] parameter: &str) {
        let err = parse_tile_name(name).unwrap_err();
        assert!(
            matches!(&err, MosaicError::InvalidParameter(p, _) if *p == parameter),
            "{err}"
        );
    }
}
