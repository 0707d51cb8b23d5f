use once_cell::sync::Lazy;
use regex::Regex;

/// Shape of an EVM-style wallet address: `0x` plus 40 hex characters.
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("invalid address regex"));

/// Shape of a referral code as produced by [`referral_code_for`].
static REFERRAL_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^REF-[A-F0-9]{16}$").expect("invalid referral code regex"));

/// Checks that `address` looks like a wallet address.
///
/// Purely syntactic; no checksum or on-chain lookup is involved.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RE.is_match(address)
}

/// Checks that `code` has the shape of a locally derived referral code.
pub fn is_referral_code(code: &str) -> bool {
    REFERRAL_CODE_RE.is_match(code)
}

/// Derives the stable referral code for a wallet address.
///
/// `REF-` followed by the first eight and last eight hex characters of
/// the address body, uppercased. The same address always produces the
/// same code. Callers must validate the address first.
pub fn referral_code_for(address: &str) -> String {
    let body = address.strip_prefix("0x").unwrap_or(address);
    let head: String = body.chars().take(8).collect();
    let tail: String = body.chars().skip(body.chars().count().saturating_sub(8)).collect();
    format!("REF-{}{}", head.to_uppercase(), tail.to_uppercase())
}

/// Shortens an address for display: first six and last four characters.
///
/// Addresses too short to truncate come back unchanged. Counts
/// characters, not bytes; the input may be an arbitrary user token.
pub fn short_address(address: &str) -> String {
    let count = address.chars().count();
    if count <= 10 {
        return address.to_string();
    }
    let head: String = address.chars().take(6).collect();
    let tail: String = address.chars().skip(count - 4).collect();
    format!("{}…{}", head, tail)
}
