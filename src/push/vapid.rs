use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config;
use crate::types::push::VapidConfig;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

/// Both keys are required; the subject always has a value.
pub fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let private_key = non_blank(config.vapid_private_key.as_deref());
    let public_key = non_blank(config.vapid_public_key.as_deref());

    match (private_key, public_key) {
        (Some(private_key), Some(public_key)) => VapidConfigStatus::Ready(VapidConfig {
            private_key: private_key.to_string(),
            public_key: public_key.to_string(),
            subject: config.vapid_subject.clone(),
        }),
        (None, None) => VapidConfigStatus::Missing,
        _ => VapidConfigStatus::Incomplete,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl VapidCredentials {
    /// Fresh P-256 key pair from the OS RNG, base64url encoded without padding.
    pub fn generate() -> Result<Self, web_push::WebPushError> {
        Self::generate_with(&mut OsRng)
    }

    pub(crate) fn generate_with<R>(rng: &mut R) -> Result<Self, web_push::WebPushError>
    where
        R: RngCore + CryptoRng,
    {
        // Draw until the bytes form a valid P-256 scalar.
        let mut scalar = [0u8; 32];
        let key_pair = loop {
            rng.fill_bytes(&mut scalar);
            if let Ok(key_pair) = ES256KeyPair::from_bytes(&scalar) {
                break key_pair;
            }
        };

        let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
        let signer =
            web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?;
        Ok(Self {
            public_key: encode_config(signer.get_public_key(), URL_SAFE_NO_PAD),
            private_key,
        })
    }
}
