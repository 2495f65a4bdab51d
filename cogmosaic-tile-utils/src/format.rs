use std::fmt::{Display, Formatter};

/// Output formats a tile URL can ask for.
///
/// `Pbf` and `Mvt` only exist so that tile URL templates can be generated for
/// vector clients; they are never rendered from raster assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
    Npy,
    Pbf,
    Mvt,
}

impl TileFormat {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::Webp,
            "tif" | "tiff" => Self::Tiff,
            "npy" => Self::Npy,
            "pbf" => Self::Pbf,
            "mvt" => Self::Mvt,
            _ => None?,
        })
    }

    /// File extension used in tile URLs.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match *self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Tiff => "tif",
            Self::Npy => "npy",
            Self::Pbf => "pbf",
            Self::Mvt => "mvt",
        }
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match *self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Npy => "application/x-binary",
            Self::Pbf | Self::Mvt => "application/x-protobuf",
        }
    }

    /// Raster formats are addressed with a `@{scale}x` suffix in tile URLs.
    #[must_use]
    pub fn is_raster(&self) -> bool {
        match *self {
            Self::Png | Self::Jpeg | Self::Webp | Self::Tiff | Self::Npy => true,
            Self::Pbf | Self::Mvt => false,
        }
    }
}

impl Display for TileFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
