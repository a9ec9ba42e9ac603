use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::sync::LazyLock;

use super::SignatureError;

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

static DATA_URI: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^data:image/png;base64,([A-Za-z0-9+/]+={0,2})$"));

/// Wrap PNG bytes as a self-describing data URI
pub fn encode_data_uri(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(png))
}

/// Extract the PNG bytes from a data URI produced by [`encode_data_uri`]
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, SignatureError> {
    let pattern = DATA_URI
        .as_ref()
        .map_err(|e| SignatureError::Decode(e.to_string()))?;
    let payload = pattern
        .captures(uri.trim())
        .and_then(|caps| caps.get(1))
        .ok_or(SignatureError::InvalidEncoding)?;

    STANDARD
        .decode(payload.as_str())
        .map_err(|_| SignatureError::InvalidEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_decode_bytes() {
        let bytes = [0x89, b'P', b'N', b'G', 0, 1, 2, 3];
        let uri = encode_data_uri(&bytes);
        assert!(uri.starts_with(PNG_DATA_URI_PREFIX));
        assert_eq!(decode_data_uri(&uri).unwrap(), bytes);
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            decode_data_uri("data:image/jpeg;base64,AAAA"),
            Err(SignatureError::InvalidEncoding)
        ));
        assert!(matches!(decode_data_uri(""), Err(SignatureError::InvalidEncoding)));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(SignatureError::InvalidEncoding)
        ));
    }
}
