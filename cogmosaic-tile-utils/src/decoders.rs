use std::io::{Read as _, Write as _};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

pub fn decode_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

pub fn encode_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_keeps_payload() {
        let data = br#"{"mosaicjson":"0.0.2"}"#;
        let encoded = encode_gzip(data).unwrap();
        assert_eq!(&encoded[0..2], b"\x1f\x8b");
        assert_eq!(decode_gzip(&encoded).unwrap(), data);
    }

    #[test]
    fn gzip_rejects_plain_text() {
        assert!(decode_gzip(b"not compressed").is_err());
    }
}
