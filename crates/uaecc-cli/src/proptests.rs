//! Property-based tests for uaecc-cli
//!
//! These tests verify correctness properties using proptest.

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;
    use uaecc_crypto::NamedCurve;

    use crate::config::{CliOverrides, Config};
    use crate::debug::{parse_hex, DebugTools};
    use crate::output::{OutputFormat, OutputFormatter};

    fn curve_strategy() -> impl Strategy<Value = NamedCurve> {
        prop_oneof![Just(NamedCurve::P256), Just(NamedCurve::BrainpoolP256r1)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // CLI overrides always win; absent overrides leave the file value.
        #[test]
        fn test_overrides_take_precedence(
            curve in proptest::option::of(curve_strategy()),
            work_dir in proptest::option::of("[a-z]{1,12}"),
            verbose in proptest::option::of(any::<bool>()),
        ) {
            let base = Config::default();
            let overrides = CliOverrides {
                curve,
                work_dir: work_dir.clone().map(PathBuf::from),
                verbose,
                ..CliOverrides::default()
            };
            let config = base.clone().with_overrides(&overrides);

            prop_assert_eq!(config.handshake.curve, curve.unwrap_or(base.handshake.curve));
            prop_assert_eq!(
                &config.exchange.work_dir,
                &work_dir.map(PathBuf::from).unwrap_or(base.exchange.work_dir)
            );
            prop_assert_eq!(config.output.verbose, verbose.unwrap_or(base.output.verbose));
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn test_parse_hex_accepts_both_cases(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            prop_assert_eq!(parse_hex("x", &hex::encode(&bytes)).unwrap(), bytes.clone());
            prop_assert_eq!(parse_hex("x", &hex::encode_upper(&bytes)).unwrap(), bytes);
        }

        // Swapping the nonces swaps which direction gets which salt body.
        #[test]
        fn test_derive_nonce_swap_changes_keys(
            secret in proptest::collection::vec(any::<u8>(), 32),
            n1 in proptest::collection::vec(any::<u8>(), 64),
            n2 in proptest::collection::vec(any::<u8>(), 64),
        ) {
            prop_assume!(n1 != n2);
            let tools = DebugTools::new();
            let secret = hex::encode(&secret);
            let a = tools.derive_keys_from_hex(&secret, &hex::encode(&n1), &hex::encode(&n2)).unwrap();
            let b = tools.derive_keys_from_hex(&secret, &hex::encode(&n2), &hex::encode(&n1)).unwrap();

            prop_assert_ne!(&a.client_keys, &b.client_keys);
            prop_assert_ne!(&a.client_keys, &a.server_keys);
        }

        #[test]
        fn test_kdf_output_length(length in 0usize..256) {
            let fmt = OutputFormatter::new(OutputFormat::Quiet, false);
            let out = DebugTools::new().kdf_from_hex("0102", "03", length).unwrap();
            prop_assert_eq!(out.len(), length * 2);
            prop_assert_eq!(fmt.format_kdf(&out, length), out);
        }
    }
}
