#![no_main]

use std::sync::LazyLock;

use aegis_license::{ClaimExpectations, RawToken, TokenValidator, TrustedKey};
use libfuzzer_sys::fuzz_target;

static VALIDATOR: LazyLock<Option<TokenValidator>> = LazyLock::new(|| {
    TrustedKey::embedded()
        .ok()
        .map(|key| TokenValidator::new(key, ClaimExpectations::default()))
});

fuzz_target!(|data: &[u8]| {
    let Some(validator) = VALIDATOR.as_ref() else {
        return;
    };
    // Nothing signed with the embedded key exists in the corpus, so every input must be rejected
    assert!(validator.validate(&RawToken::from_bytes(data)).is_err());
});
