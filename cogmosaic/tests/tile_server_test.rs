use actix_web::http::StatusCode;
use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::test::{TestRequest, call_service, read_body, read_body_json};
use cogmosaic_core::mosaic::MOSAIC_ID_LEN;
use rstest::rstest;
use serde_json::{Value, json};

pub mod utils;
pub use utils::*;

macro_rules! create_app {
    () => {{
        let _ = env_logger::builder().is_test(true).try_init();
        ::actix_web::test::init_service(
            ::actix_web::App::new()
                .app_data(::actix_web::web::Data::new(mock_service()))
                .app_data(::actix_web::web::Data::new(srv_config()))
                .configure(::cogmosaic::srv::router),
        )
        .await
    }};
}

fn test_get(path: &str) -> TestRequest {
    TestRequest::get().uri(path)
}

/// Create the red and blue mosaic and return its identifier.
macro_rules! create_mosaic {
    ($app:expr) => {{
        let req = TestRequest::post()
            .uri("/create")
            .set_json(json!(["red.tif", "blue.tif"]))
            .to_request();
        let tilejson: Value = read_body_json(call_service(&$app, req).await).await;
        tilejson["name"].as_str().unwrap().to_string()
    }};
}

#[actix_rt::test]
async fn format_negotiation() {
    let app = create_app!();
    let id = create_mosaic!(app);

    let response = call_service(&app, test_get(&format!("/{id}/2/1/1")).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get(CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    assert!(read_body(response).await.starts_with(b"\xFF\xD8"));

    let response = call_service(&app, test_get(&format!("/{id}/2/1/1.png")).to_request()).await;
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
    assert!(read_body(response).await.starts_with(b"\x89PNG"));
}

#[rstest]
#[case("tif", "image/tiff")]
#[case("webp", "image/webp")]
#[case("npy", "application/x-binary")]
#[actix_rt::test]
async fn explicit_formats(#[case] ext: &str, #[case] content_type: &str) {
    let app = create_app!();
    let id = create_mosaic!(app);
    let path = format!("/{id}/2/0/1@2x.{ext}");
    let response = call_service(&app, test_get(&path).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK, "{path}");
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), content_type);
}

#[actix_rt::test]
async fn scaled_tiles() {
    let app = create_app!();
    let id = create_mosaic!(app);
    let path = format!("/{id}/2/0/1@2x.npy");
    let body = read_body(call_service(&app, test_get(&path).to_request()).await).await;
    // three bands and the mask of 512 x 512 pixels
    assert_eq!(npy_data(&body).len(), 4 * 512 * 512);
}

#[rstest]
#[case("", RED)]
#[case("?pixel_selection=first", RED)]
#[case("?pixel_selection=last", BLUE)]
#[case("?pixel_selection=highest", [255, 0, 255])]
#[case("?pixel_selection=lowest", [0, 0, 0])]
#[case("?pixel_selection=mean&resampling_method=bilinear", [127, 0, 127])]
#[actix_rt::test]
async fn pixel_selection(#[case] query: &str, #[case] color: [u8; 3]) {
    let app = create_app!();
    let id = create_mosaic!(app);
    let path = format!("/{id}/2/1/1.npy{query}");
    let response = call_service(&app, test_get(&path).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK, "{path}");
    let body = read_body(response).await;
    let planes = npy_data(&body);
    let plane = planes.len() / 4;
    assert_eq!([planes[0], planes[plane], planes[2 * plane]], color);
    assert_eq!(planes[3 * plane], 255);
}

#[actix_rt::test]
async fn url_referenced_tiles() {
    let app = create_app!();
    let id = create_mosaic!(app);
    let path = format!("/2/0/1.png?url=memory:///mosaics/{id}.json.gz");
    let response = call_service(&app, test_get(&path).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
}

#[actix_rt::test]
async fn empty_tiles() {
    let app = create_app!();
    let id = create_mosaic!(app);
    // no asset is indexed east of 90 degrees
    let response = call_service(&app, test_get(&format!("/{id}/2/3/0")).to_request()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(CACHE_CONTROL).is_none());
    assert!(read_body(response).await.is_empty());
}

#[rstest]
#[case("/{id}/2/1/1.pbf", "Tile format pbf is not supported for raster tiles")]
#[case("/{id}/2/1/1.gif", "Invalid value 'gif' for parameter 'format'")]
#[case("/{id}/2/1/1@0x", "Invalid value '0' for parameter 'scale'")]
#[case("/{id}/2/9/1", "Invalid tile 2/9/1")]
#[case(
    "/{id}/2/1/1?pixel_selection=brightest",
    "Invalid value 'brightest' for parameter 'pixel_selection'"
)]
#[case(
    "/{id}/2/1/1?resampling_method=gauss",
    "Invalid value 'gauss' for parameter 'resampling_method'"
)]
#[case("/2/1/1", "Missing 'MosaicID or URL' parameter")]
#[actix_rt::test]
async fn bad_requests(#[case] path: &str, #[case] message: &str) {
    let app = create_app!();
    let id = create_mosaic!(app);
    let path = path.replace("{id}", &id);
    let response = call_service(&app, test_get(&path).to_request()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
    assert_eq!(read_body(response).await, message);
}

#[rstest]
#[case("/{unknown}/2/1/1")]
#[case("/abcdef/2/1/1")]
#[case("/{id}/300/1/1")]
#[case("/{id}/2/1/one")]
#[case("/2/1/1?url=memory:///mosaics/unknown.json.gz")]
#[actix_rt::test]
async fn not_found(#[case] path: &str) {
    let app = create_app!();
    let id = create_mosaic!(app);
    let unknown = "f".repeat(MOSAIC_ID_LEN);
    let path = path.replace("{id}", &id).replace("{unknown}", &unknown);
    let response = call_service(&app, test_get(&path).to_request()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
}

#[actix_rt::test]
async fn uppercase_identifiers() {
    let app = create_app!();
    let id = create_mosaic!(app);
    let path = format!("/{}/2/0/1", id.to_uppercase());
    let response = call_service(&app, test_get(&path).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
}
