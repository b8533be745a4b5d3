use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use pkcs8::DecodePrivateKey as _;
use rsa::pkcs1::{DecodeRsaPrivateKey as _, EncodeRsaPrivateKey as _};
use sha2::{Digest, Sha256};

use crate::Error;

/// Lifetime of a client assertion; AAD only needs it for the token exchange.
const ASSERTION_TTL_SECS: u64 = 600;

/// `x5t#S256` header value: base64url SHA-256 of the certificate DER.
pub(crate) fn certificate_thumbprint(pem_bundle: &str) -> Result<String, Error> {
    let blocks = pem::parse_many(pem_bundle.as_bytes())
        .map_err(|e| Error::Key(format!("Certificate PEM parse failed: {e}")))?;
    let cert = blocks
        .iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .ok_or_else(|| Error::Key("No CERTIFICATE block found in PEM".into()))?;
    let hash = Sha256::digest(cert.contents());
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash))
}

pub(crate) fn load_rsa_private_key_from_pem(
    pem_str: &str,
    passphrase: Option<&str>,
) -> Result<rsa::RsaPrivateKey, Error> {
    let blocks = pem::parse_many(pem_str.as_bytes())
        .map_err(|e| Error::Key(format!("Private key PEM parse failed: {e}")))?;
    for block in &blocks {
        match block.tag() {
            "ENCRYPTED PRIVATE KEY" => {
                let pass = passphrase.ok_or_else(|| {
                    Error::Key("Encrypted private key provided but no passphrase set".into())
                })?;
                return rsa::RsaPrivateKey::from_pkcs8_encrypted_der(block.contents(), pass)
                    .map_err(|e| Error::Key(format!("PKCS#8 decryption failed: {e}")));
            }
            "PRIVATE KEY" => {
                return rsa::RsaPrivateKey::from_pkcs8_der(block.contents())
                    .map_err(|e| Error::Key(format!("PKCS#8 parse failed: {e}")));
            }
            "RSA PRIVATE KEY" => {
                return rsa::RsaPrivateKey::from_pkcs1_der(block.contents())
                    .map_err(|e| Error::Key(format!("PKCS#1 parse failed: {e}")));
            }
            _ => continue,
        }
    }
    Err(Error::Key("No RSA private key found in PEM".into()))
}

#[derive(serde::Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: u64,
    iat: u64,
    exp: u64,
}

/// Signs the RS256 client assertion used in place of a client secret.
pub(crate) fn build_client_assertion(
    app_id: &str,
    token_endpoint: &str,
    pem_bundle: &str,
    passphrase: Option<&str>,
) -> Result<String, Error> {
    let thumbprint = certificate_thumbprint(pem_bundle)?;
    let rsa_key = load_rsa_private_key_from_pem(pem_bundle, passphrase)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Config(format!("Time error: {e}")))?
        .as_secs();
    let claims = AssertionClaims {
        aud: token_endpoint,
        iss: app_id,
        sub: app_id,
        jti: uuid::Uuid::new_v4().to_string(),
        nbf: now,
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };

    let pkcs1 = rsa_key
        .to_pkcs1_der()
        .map_err(|e| Error::Key(format!("PKCS#1 DER encode failed: {e}")))?;
    let enc_key = jsonwebtoken::EncodingKey::from_rsa_der(pkcs1.as_bytes());
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
    header.x5t_s256 = Some(thumbprint);
    jsonwebtoken::encode(&header, &claims, &enc_key)
        .map_err(|e| Error::JwtSign(format!("JWT signing failed: {e}")))
}
