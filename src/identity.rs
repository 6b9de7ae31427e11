// src/identity.rs
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::types::Identity;

pub const INSTALL_ID_LEN: usize = 22;
pub const FCM_SUFFIX_LEN: usize = 134;
pub const FCM_PREFIX: &str = ":APA91b";

/// `n` characters drawn uniformly from `[A-Za-z0-9]`.
pub fn generate_random_string(n: usize) -> String {
    generate_random_string_with(&mut rand::thread_rng(), n)
}

pub fn generate_random_string_with<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

pub fn generate_identity() -> Identity {
    generate_identity_with(&mut rand::thread_rng())
}

/// The FCM token reuses the install id as its prefix; no uniqueness check is made.
pub fn generate_identity_with<R: Rng + ?Sized>(rng: &mut R) -> Identity {
    let install_id = generate_random_string_with(rng, INSTALL_ID_LEN);
    let fcm_token = format!(
        "{install_id}{FCM_PREFIX}{}",
        generate_random_string_with(rng, FCM_SUFFIX_LEN)
    );
    Identity {
        install_id,
        fcm_token,
    }
}
