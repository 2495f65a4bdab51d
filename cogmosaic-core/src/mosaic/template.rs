use cogmosaic_tile_utils::TileFormat;
use url::form_urlencoded;

use crate::mosaic::MosaicRef;

/// Tile URL template advertised by `/create` and `/tilejson.json`.
///
/// `host` is the public root of the service. Mosaics with an identifier are
/// served below `{host}/{id}`, URL referenced mosaics below `{host}` with the
/// URL passed along as the `url` query parameter after all other `query` pairs.
#[must_use]
pub fn tile_url_template(
    host: &str,
    reference: &MosaicRef,
    format: Option<TileFormat>,
    scale: u8,
    query: &[(String, String)],
) -> String {
    let host = host.trim_end_matches('/');
    let prefix = match reference {
        MosaicRef::Id(id) => format!("{host}/{id}"),
        MosaicRef::Url(_) => host.to_string(),
    };
    let mut template = match format {
        Some(fmt) if !fmt.is_raster() => format!("{prefix}/{{z}}/{{x}}/{{y}}.{fmt}"),
        Some(fmt) => format!("{prefix}/{{z}}/{{x}}/{{y}}@{scale}x.{fmt}"),
        None => format!("{prefix}/{{z}}/{{x}}/{{y}}@{scale}x"),
    };

    let mut qs = form_urlencoded::Serializer::new(String::new());
    qs.extend_pairs(query);
    if let MosaicRef::Url(url) = reference {
        qs.append_pair("url", url);
    }
    let qs = qs.finish();
    if !qs.is_empty() {
        template.push('?');
        template.push_str(&qs);
    }
    template
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::mosaic::MosaicId;

    const ID: &str = "0123456789abcdef0123456789abcdef0123456789abcdef01234567";

    fn by_id() -> MosaicRef {
        MosaicRef::Id(MosaicId::parse(ID).unwrap())
    }

    #[rstest]
    #[case(None, 1, "/{z}/{x}/{y}@1x")]
    #[case(Some(TileFormat::Png), 2, "/{z}/{x}/{y}@2x.png")]
    #[case(Some(TileFormat::Jpeg), 1, "/{z}/{x}/{y}@1x.jpg")]
    #[case(Some(TileFormat::Webp), 1, "/{z}/{x}/{y}@1x.webp")]
    #[case(Some(TileFormat::Tiff), 3, "/{z}/{x}/{y}@3x.tif")]
    #[case(Some(TileFormat::Npy), 1, "/{z}/{x}/{y}@1x.npy")]
    #[case(Some(TileFormat::Pbf), 2, "/{z}/{x}/{y}.pbf")]
    #[case(Some(TileFormat::Mvt), 1, "/{z}/{x}/{y}.mvt")]
    fn templates_by_format(
        #[case] format: Option<TileFormat>,
        #[case] scale: u8,
        #[case] suffix: &str,
    ) {
        let template = tile_url_template("https://tiles.example.org", &by_id(), format, scale, &[]);
        assert_eq!(template, format!("https://tiles.example.org/{ID}{suffix}"));
    }

    #[test]
    fn pass_through_query() {
        let query = [
            ("pixel_selection".to_string(), "last".to_string()),
            ("color ramp".to_string(), "a&b".to_string()),
        ];
        let template = tile_url_template("http://localhost:3000/", &by_id(), None, 1, &query);
        assert_eq!(
            template,
            format!(
                "http://localhost:3000/{ID}/{{z}}/{{x}}/{{y}}@1x?pixel_selection=last&color+ramp=a%26b"
            )
        );
    }

    #[test]
    fn url_reference_goes_into_query() {
        let reference = MosaicRef::Url("s3://bucket/my mosaic.json".to_string());
        let query = [("resampling_method".to_string(), "bilinear".to_string())];
        let template =
            tile_url_template("http://host", &reference, Some(TileFormat::Png), 1, &query);
        assert_eq!(
            template,
            "http://host/{z}/{x}/{y}@1x.png?resampling_method=bilinear&url=s3%3A%2F%2Fbucket%2Fmy+mosaic.json"
        );
    }
}
