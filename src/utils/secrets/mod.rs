use rand::seq::SliceRandom;
use rand::Rng;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const URL_SAFE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const PUNCTUATION: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Source of generated credentials. Injected into the compose context so tests can pin values.
pub trait SecretGenerator: Send + Sync {
    /// Random string of `length` characters from the URL-safe alphabet.
    fn generate_secret(&self, length: usize) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn generate_secret(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| URL_SAFE[rng.gen_range(0..URL_SAFE.len())] as char)
            .collect()
    }
}

/// Password of letters, digits and punctuation whose first character is alphanumeric.
pub fn generate_password(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::thread_rng();
    let full: Vec<u8> = ALPHANUMERIC.iter().chain(PUNCTUATION).copied().collect();
    let mut password = String::with_capacity(length);
    if let Some(first) = ALPHANUMERIC.choose(&mut rng) {
        password.push(*first as char);
    }
    for _ in 1..length {
        if let Some(ch) = full.choose(&mut rng) {
            password.push(*ch as char);
        }
    }
    password
}

/// Single-quote a value for an env file, escaping quotes that are not already escaped.
pub fn quote_env_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    let mut previous = None;
    for ch in value.chars() {
        if ch == '\'' && previous != Some('\\') {
            out.push('\\');
        }
        out.push(ch);
        previous = Some(ch);
    }
    out.push('\'');
    out
}
