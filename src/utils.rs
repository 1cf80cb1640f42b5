//! Identifier generation

use anyhow::Context;
use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique internal shipment id then encode using bech32
pub fn new_shipment_id(prefix: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(prefix)
        .with_context(|| format!("invalid shipment id prefix {prefix:?}"))?;
    let encoded = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_the_prefix_and_are_unique() {
        let a = new_shipment_id("ship").unwrap();
        let b = new_shipment_id("ship").unwrap();

        assert!(a.starts_with("ship1"));
        assert_ne!(a, b);
    }

    #[test]
    fn empty_prefix_is_rejected() {
        assert!(new_shipment_id("").is_err());
    }
}
