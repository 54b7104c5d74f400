use jwt_simple::prelude::*;

use crate::errors::SnowflakeResult;

/// Snowflake expects the standard base64 alphabet with padding,
/// while `jwt_simple` produces the URL-safe form
fn public_key_fingerprint(key_pair: &RS256KeyPair) -> String {
    let mut fingerprint = key_pair
        .public_key()
        .sha256_thumbprint()
        .replace('-', "+")
        .replace('_', "/");
    while fingerprint.len() % 4 != 0 {
        fingerprint.push('=');
    }
    fingerprint
}

/// AAA00000.us-east-1 becomes AAA00000
fn account_locator(account_identifier: &str) -> &str {
    account_identifier
        .split_once('.')
        .map_or(account_identifier, |(locator, _)| locator)
}

/// Sign a key-pair JWT for the SQL API
pub(crate) fn create_token(
    key_pair: &RS256KeyPair,
    account_identifier: &str,
    user: &str,
) -> SnowflakeResult<String> {
    let fingerprint = public_key_fingerprint(key_pair);
    log::debug!("Public key fingerprint: {}", fingerprint);
    let qualified_username = format!(
        "{}.{}",
        account_locator(account_identifier).to_ascii_uppercase(),
        user.to_ascii_uppercase()
    );
    let claims = Claims::create(Duration::from_mins(59))
        .with_issuer(format!("{qualified_username}.SHA256:{fingerprint}"))
        .with_subject(qualified_username);
    Ok(key_pair.sign(claims)?)
}
