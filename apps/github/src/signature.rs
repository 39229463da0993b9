use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("signature header is not `sha256=<hex>`")]
    Malformed,
    #[error("signature does not match body")]
    Mismatch,
}

/// Checks GitHub's `X-Hub-Signature-256: sha256=<hex hmac>` against `body`.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.filter(|h| !h.is_empty()).ok_or(SignatureError::Missing)?;
    let provided = header
        .strip_prefix("sha256=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SignatureError::Malformed)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produces the header value GitHub would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_its_own_signature() {
        let header = sign("It's a Secret to Everybody", b"Hello, World!");
        assert_eq!(
            header,
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
        assert!(
            verify_signature("It's a Secret to Everybody", b"Hello, World!", Some(&header)).is_ok()
        );
    }

    #[test]
    fn rejects_missing_malformed_and_wrong_signatures() {
        assert_eq!(verify_signature("s", b"x", None), Err(SignatureError::Missing));
        assert_eq!(
            verify_signature("s", b"x", Some("md5=abcd")),
            Err(SignatureError::Malformed)
        );
        let other = sign("other", b"x");
        assert_eq!(
            verify_signature("s", b"x", Some(&other)),
            Err(SignatureError::Mismatch)
        );
    }
}
