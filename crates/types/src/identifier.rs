//! Account and asset identifier parsing.
//!
//! Canonical forms: accounts are `name@domain`, assets are `name#domain`.
//! Both are split on the shared delimiter set `{@, #}`.

use thiserror::Error;

/// Delimiter between an account name and its domain.
pub const ACCOUNT_DELIMITER: char = '@';
/// Delimiter between an asset name and its domain.
pub const ASSET_DELIMITER: char = '#';

/// Errors from identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier did not split into exactly two non-empty parts.
    #[error("identifier `{0}` does not split into exactly two non-empty parts")]
    NotTwoParts(String),
}

/// Split an identifier on the delimiter set `{@, #}`, skipping empty segments.
///
/// Total over all inputs: never fails, never returns empty segments.
pub fn split_id(id: &str) -> Vec<&str> {
    id.split([ACCOUNT_DELIMITER, ASSET_DELIMITER])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Split an account or asset id into `(local, domain)`.
///
/// Rejects any input that does not yield exactly two non-empty parts.
pub fn parse_two_part(id: &str) -> Result<(&str, &str), IdError> {
    match split_id(id).as_slice() {
        [local, domain] => Ok((local, domain)),
        _ => Err(IdError::NotTwoParts(id.to_owned())),
    }
}

/// Domain part of a two-part identifier.
pub fn domain_of(id: &str) -> Result<&str, IdError> {
    parse_two_part(id).map(|(_, domain)| domain)
}

/// Build a canonical account id from its parts.
pub fn make_account_id(name: &str, domain: &str) -> String {
    format!("{name}{ACCOUNT_DELIMITER}{domain}")
}

/// Build a canonical asset id from its parts.
pub fn make_asset_id(name: &str, domain: &str) -> String {
    format!("{name}{ASSET_DELIMITER}{domain}")
}
