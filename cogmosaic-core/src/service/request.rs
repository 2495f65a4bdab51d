use cogmosaic_tile_utils::{TILE_SIZE, TileCoord, TileFormat};

use crate::mosaic::{MosaicRef, tile_url_template};
use crate::pixsel::PixelSelection;
use crate::reader::Resampling;
use crate::{MosaicError, MosaicResult};

/// Highest accepted tile scale, giving 2304 pixel tiles.
pub const MAX_SCALE: u8 = 9;

/// A validated request for one composited tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRequest {
    /// The mosaic to render.
    pub mosaic: MosaicRef,
    /// The tile to render.
    pub xyz: TileCoord,
    /// Multiple of 256 pixels of the tile size.
    pub scale: u8,
    /// Explicitly requested output format.
    pub format: Option<TileFormat>,
    /// How overlapping assets are merged.
    pub pixel_selection: PixelSelection,
    /// How asset pixels are resampled.
    pub resampling: Resampling,
}

impl TileRequest {
    /// Request tile `z/x/y` of `mosaic` with default options.
    pub fn new(mosaic: MosaicRef, z: u8, x: u32, y: u32) -> MosaicResult<Self> {
        let xyz = TileCoord::new_checked(z, x, y)
            .ok_or(MosaicError::InvalidTile(TileCoord { z, x, y }))?;
        Ok(Self {
            mosaic,
            xyz,
            scale: 1,
            format: None,
            pixel_selection: PixelSelection::default(),
            resampling: Resampling::default(),
        })
    }

    /// Render `scale` times the default tile size.
    pub fn with_scale(mut self, scale: u8) -> MosaicResult<Self> {
        if !(1..=MAX_SCALE).contains(&scale) {
            return Err(MosaicError::InvalidParameter("scale", scale.to_string()));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Output format, negotiated from the tile content if `None`.
    #[must_use]
    pub fn with_format(mut self, format: Option<TileFormat>) -> Self {
        self.format = format;
        self
    }

    /// Pixel selection method.
    #[must_use]
    pub fn with_pixel_selection(mut self, pixel_selection: PixelSelection) -> Self {
        self.pixel_selection = pixel_selection;
        self
    }

    /// Resampling method.
    #[must_use]
    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }

    /// Width and height of the rendered tile in pixels.
    #[must_use]
    pub fn tile_size(&self) -> u32 {
        TILE_SIZE * u32::from(self.scale)
    }
}

/// How advertised tile URLs are built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileUrlOptions {
    /// Public root of the service.
    pub host: String,
    /// Format extension of the tiles, none to negotiate.
    pub format: Option<TileFormat>,
    /// Tile scale.
    pub scale: u8,
    /// Query parameters passed on to tile requests.
    pub query: Vec<(String, String)>,
}

impl TileUrlOptions {
    /// Options for tiles served below `host` at scale 1.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            format: None,
            scale: 1,
            query: Vec::new(),
        }
    }

    /// Tile URL template of `reference`.
    #[must_use]
    pub fn template(&self, reference: &MosaicRef) -> String {
        tile_url_template(&self.host, reference, self.format, self.scale, &self.query)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn url() -> MosaicRef {
        MosaicRef::Url("s3://bucket/mosaic.json".to_string())
    }

    #[rstest]
    #[case(0, 0, 0, true)]
    #[case(1, 1, 1, true)]
    #[case(1, 2, 0, false)]
    #[case(3, 0, 8, false)]
    #[case(30, 0, 0, true)]
    #[case(31, 0, 0, false)]
    fn tile_validity(#[case] z: u8, #[case] x: u32, #[case] y: u32, #[case] valid: bool) {
        let request = TileRequest::new(url(), z, x, y);
        assert_eq!(request.is_ok(), valid);
        if let Err(err) = request {
            assert!(matches!(err, MosaicError::InvalidTile(t) if t == TileCoord { z, x, y }));
        }
    }

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(256))]
    #[case(2, Some(512))]
    #[case(9, Some(2304))]
    #[case(10, None)]
    fn scales(#[case] scale: u8, #[case] size: Option<u32>) {
        let request = TileRequest::new(url(), 1, 0, 0).unwrap().with_scale(scale);
        assert_eq!(request.ok().map(|r| r.tile_size()), size);
    }

    #[test]
    fn url_options() {
        let mut options = TileUrlOptions::new("http://localhost:8000/");
        options.format = Some(TileFormat::Png);
        options.scale = 2;
        options.query.push(("rescale".to_string(), "0,1000".to_string()));
        assert_eq!(
            options.template(&url()),
            "http://localhost:8000/{z}/{x}/{y}@2x.png?rescale=0%2C1000&url=s3%3A%2F%2Fbucket%2Fmosaic.json"
        );
    }
}
