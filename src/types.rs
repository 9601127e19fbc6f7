use alloy_primitives::aliases::{U48, U96};
use alloy_primitives::{Address, B256, U256};
use anyhow::{anyhow, Result};
use chrono::{Local, TimeZone};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ASSET_CLASS: u64 = 1;
/// Default lifetime of an opt-in/opt-out authorization: seven days.
pub const DEFAULT_SIGNATURE_DURATION: u64 = 7 * 24 * 60 * 60;

const UINT48_MAX: u64 = (1 << 48) - 1;

/// Parse a `0x`-prefixed, 40 hex digit address. Checksums are not enforced on input.
pub fn parse_address(value: &str) -> Result<Address> {
    let well_formed = value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|byte| byte.is_ascii_hexdigit()));
    if !well_formed {
        anyhow::bail!("{value} is not a valid address");
    }
    Address::from_str(value).map_err(|err| anyhow!("invalid address {value}: {err}"))
}

pub fn parse_b256(value: &str) -> Result<B256> {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.len() != 64 || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        anyhow::bail!("{hex} is not a valid bytes32 hex string");
    }
    B256::from_str(hex).map_err(|err| anyhow!("invalid bytes32 {value}: {err}"))
}

pub fn parse_u256(value: &str) -> Result<U256> {
    parse_bounded(value, 256, "uint256")
}

/// Asset class and subnetwork ids.
pub fn parse_uint96(value: &str) -> Result<U256> {
    parse_bounded(value, 96, "uint96")
}

/// An already parsed uint96 as the static bindings take it.
pub fn to_uint96(value: U256) -> Result<U96> {
    U96::try_from_be_slice(&value.to_be_bytes::<32>()).ok_or_else(|| anyhow!("{value} is not a valid uint96"))
}

pub fn to_uint48(value: u64) -> Result<U48> {
    U48::try_from(value).map_err(|_| anyhow!("{value} is not a valid uint48"))
}

pub fn parse_uint48(value: &str) -> Result<u64> {
    let parsed = parse_bounded(value, 48, "uint48")?;
    u64::try_from(parsed).map_err(|_| anyhow!("{value} is not a valid uint48"))
}

fn parse_bounded(value: &str, bits: usize, name: &str) -> Result<U256> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        anyhow::bail!("{value} is not a valid integer");
    }
    let out_of_range = || anyhow!("{value} is not a valid {name} (must be between 0 and 2^{bits} - 1)");
    if trimmed.starts_with('-') && digits.bytes().any(|byte| byte != b'0') {
        return Err(out_of_range());
    }
    let parsed = U256::from_str_radix(digits, 10).map_err(|_| out_of_range())?;
    if bits < 256 && parsed.bit_len() > bits {
        return Err(out_of_range());
    }
    Ok(parsed)
}

/// Fixed-width subnetwork key: the 20 address bytes followed by the id as a
/// big-endian 96-bit integer. Bits of `id` above 96 are dropped.
pub fn subnetwork(network: Address, id: U256) -> B256 {
    let mut key = id.to_be_bytes::<32>();
    key[..20].copy_from_slice(network.as_slice());
    B256::from(key)
}

/// A positive decimal token amount as typed by the user, before the token's
/// decimals are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAmount {
    whole: U256,
    fraction: String,
}

impl TokenAmount {
    /// Scale to base units. Digits past `decimals` are truncated.
    pub fn to_wei(&self, decimals: u8) -> Result<U256> {
        let too_large = || anyhow!("Amount is too large");
        let decimals = u32::from(decimals);
        let whole = self.whole.checked_mul(pow10(decimals)?).ok_or_else(too_large)?;

        let kept = self.fraction.len().min(decimals as usize);
        if kept == 0 {
            return Ok(whole);
        }
        let fraction = U256::from_str_radix(&self.fraction[..kept], 10)?;
        let fraction = fraction
            .checked_mul(pow10(decimals - kept as u32)?)
            .ok_or_else(too_large)?;
        whole.checked_add(fraction).ok_or_else(too_large)
    }
}

impl FromStr for TokenAmount {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || anyhow!("{value} is not a valid token amount");
        let trimmed = value.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return Err(invalid());
        }

        let fraction = fraction.trim_end_matches('0');
        let is_zero = whole.bytes().all(|byte| byte == b'0') && fraction.is_empty();
        if negative && !is_zero {
            anyhow::bail!("Token amount cannot be negative");
        }
        if is_zero {
            anyhow::bail!("Token amount should not be zero");
        }

        let whole = if whole.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(whole, 10).map_err(|_| anyhow!("Token amount is too large"))?
        };

        Ok(Self {
            whole,
            fraction: fraction.to_string(),
        })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}.{}", self.whole, self.fraction)
        }
    }
}

fn pow10(exp: u32) -> Result<U256> {
    let mut value = U256::from(1u64);
    for _ in 0..exp {
        value = value
            .checked_mul(U256::from(10u64))
            .ok_or_else(|| anyhow!("Amount is too large"))?;
    }
    Ok(value)
}

/// Render base units as a decimal string, trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = decimals as usize;
    if decimals == 0 {
        return value.to_string();
    }
    let mut digits = value.to_string();
    if digits.len() <= decimals {
        let zeros = "0".repeat(decimals + 1 - digits.len());
        digits = format!("{zeros}{digits}");
    }
    let split = digits.len() - decimals;
    let mut out = format!("{}.{}", &digits[..split], &digits[split..]);
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out
}

/// Local wall-clock rendering of a unix timestamp.
pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Unix timestamp `duration` seconds from now, bounded to uint48.
pub fn deadline_after(duration: u64) -> Result<u64> {
    let now = u64::try_from(chrono::Utc::now().timestamp())?;
    now.checked_add(duration)
        .filter(|deadline| *deadline <= UINT48_MAX)
        .ok_or_else(|| anyhow!("deadline does not fit in uint48"))
}

/// The zero address stands for "the signer itself" in beneficiary arguments.
pub fn or_signer(target: Address, signer: Address) -> Address {
    if target.is_zero() {
        signer
    } else {
        target
    }
}

/// Actions that move funds to or from an account other than the signer ask first.
pub fn needs_confirmation(target: Address, signer: Address) -> bool {
    target != signer
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn address_parsing_requires_prefix_and_length() {
        assert!(parse_address("0x0165878A594ca255338adfa4d48449f69242Eb8F").is_ok());
        assert!(parse_address("0165878A594ca255338adfa4d48449f69242Eb8F").is_err());
        assert!(parse_address("0x0165878A594ca255338adfa4d48449f69242Eb8").is_err());
        let err = parse_address("0xzz65878A594ca255338adfa4d48449f69242Eb8F").unwrap_err();
        assert!(err.to_string().ends_with("is not a valid address"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let lower = "0x0165878a594ca255338adfa4d48449f69242eb8f";
        let canonical = parse_address(lower).unwrap().to_string();
        assert_eq!(canonical, "0x0165878A594ca255338adfa4d48449f69242Eb8F");
        assert_eq!(parse_address(&canonical).unwrap().to_string(), canonical);
        let upper = lower.to_uppercase().replacen("0X", "0x", 1);
        assert_eq!(parse_address(&upper).unwrap().to_string(), canonical);
    }

    #[test]
    fn subnetwork_layout() {
        let l1 = address!("5FC8d32690cc91D4c39d9d3abcBD16989F875707");
        let key = subnetwork(l1, U256::from(1u64));
        assert_eq!(&key[..20], l1.as_slice());
        assert_eq!(&key[20..31], &[0u8; 11]);
        assert_eq!(key[31], 1);
    }

    #[test]
    fn subnetwork_keeps_ids_wider_than_64_bits() {
        let l1 = address!("5FC8d32690cc91D4c39d9d3abcBD16989F875707");
        let id = parse_uint96("79228162514264337593543950335").unwrap();
        let key = subnetwork(l1, id);
        assert_eq!(&key[..20], l1.as_slice());
        assert_eq!(&key[20..], &[0xffu8; 12]);
    }

    #[test]
    fn subnetwork_is_injective_over_small_ids() {
        let a = address!("5FC8d32690cc91D4c39d9d3abcBD16989F875707");
        let b = address!("B9826Bbf0deB10cC3924449B93F418db6b16be36");
        for id in 0..8u64 {
            let (id, next) = (U256::from(id), U256::from(id + 1));
            assert_ne!(subnetwork(a, id), subnetwork(a, next));
            assert_ne!(subnetwork(a, id), subnetwork(b, id));
        }
    }

    #[test]
    fn bounded_integers() {
        assert_eq!(parse_uint48("604800").unwrap(), 604800);
        assert!(parse_uint48("281474976710656").is_err());
        assert_eq!(parse_uint48("281474976710655").unwrap(), UINT48_MAX);
        assert_eq!(parse_uint96("1").unwrap(), U256::from(1u64));
        assert!(parse_u256("-1").is_err());
        assert!(parse_u256("abc").unwrap_err().to_string().contains("not a valid integer"));
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_u256(max).unwrap(), U256::MAX);
        assert!(parse_u256(&format!("{max}0")).is_err());
    }

    #[test]
    fn uint96_accepts_the_full_range() {
        assert_eq!(parse_uint96("18446744073709551616").unwrap(), U256::from(1u64) << 64);
        let max = parse_uint96("79228162514264337593543950335").unwrap();
        assert_eq!(max, (U256::from(1u64) << 96) - U256::from(1u64));
        let err = parse_uint96("79228162514264337593543950336").unwrap_err();
        assert!(err.to_string().contains("not a valid uint96"));
    }

    #[test]
    fn narrowing_for_static_bindings() {
        let class = parse_uint96("18446744073709551616").unwrap();
        assert_eq!(U256::from(to_uint96(class).unwrap()), class);
        assert!(to_uint96(U256::from(1u64) << 96).is_err());
        assert_eq!(to_uint48(UINT48_MAX).unwrap(), U48::MAX);
        assert!(to_uint48(UINT48_MAX + 1).is_err());
    }

    #[test]
    fn bytes32_accepts_optional_prefix() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert_eq!(parse_b256(key).unwrap(), parse_b256(&format!("0x{key}")).unwrap());
        assert!(parse_b256("0x1234").is_err());
    }

    #[test]
    fn token_amount_rejections() {
        let message = |value: &str| value.parse::<TokenAmount>().unwrap_err().to_string();
        assert_eq!(message("0"), "Token amount should not be zero");
        assert_eq!(message("0.000"), "Token amount should not be zero");
        assert_eq!(message("-5"), "Token amount cannot be negative");
        assert_eq!(message("1.2.3"), "1.2.3 is not a valid token amount");
        assert_eq!(message("."), ". is not a valid token amount");
        let too_large = format!("{}", U256::MAX) + "0";
        assert_eq!(message(&too_large), "Token amount is too large");
    }

    #[test]
    fn token_amount_to_wei() {
        let amount: TokenAmount = "1000".parse().unwrap();
        assert_eq!(amount.to_wei(18).unwrap(), U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(amount.to_wei(0).unwrap(), U256::from(1000u64));

        let amount: TokenAmount = "1.5".parse().unwrap();
        assert_eq!(amount.to_wei(6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(amount.to_string(), "1.5");

        let truncated: TokenAmount = "0.1234567".parse().unwrap();
        assert_eq!(truncated.to_wei(3).unwrap(), U256::from(123u64));

        let huge: TokenAmount = format!("{}", U256::MAX).parse().unwrap();
        assert_eq!(huge.to_wei(1).unwrap_err().to_string(), "Amount is too large");
    }

    #[test]
    fn units_formatting() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
        assert_eq!(format_units(U256::from(5u64), 3), "0.005");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn beneficiary_defaults_and_prompts() {
        let signer = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let other = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
        assert_eq!(or_signer(Address::ZERO, signer), signer);
        assert_eq!(or_signer(other, signer), other);
        assert!(!needs_confirmation(or_signer(Address::ZERO, signer), signer));
        assert!(!needs_confirmation(signer, signer));
        assert!(needs_confirmation(other, signer));
    }
}
