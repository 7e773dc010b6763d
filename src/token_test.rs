use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token / generate_salt
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

#[test]
fn generate_salt_is_32_hex_chars() {
    assert_eq!(generate_salt().len(), 32);
}

// =============================================================================
// hash_secret
// =============================================================================

#[test]
fn hash_secret_is_deterministic_per_salt() {
    assert_eq!(hash_secret("s1", "hunter22"), hash_secret("s1", "hunter22"));
    assert_ne!(hash_secret("s1", "hunter22"), hash_secret("s2", "hunter22"));
}

#[test]
fn hash_secret_known_vector() {
    // sha256("abc")
    assert_eq!(
        hash_secret("", "abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
