//! Password hashing in the werkzeug `pbkdf2:sha256:<iterations>$<salt>$<hex>`
//! format, so hashes written by earlier deployments keep verifying.

use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

/// PBKDF2-SHA256 hasher with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SALT_LENGTH)
            .map(char::from)
            .collect();
        let digest = derive(password, &salt, self.iterations);
        format!("pbkdf2:sha256:{}${}${}", self.iterations, salt, hex::encode(digest))
    }

    /// Check `password` against a stored hash. Unknown formats never verify.
    pub fn verify(&self, stored: &str, password: &str) -> bool {
        let Some(parsed) = ParsedHash::parse(stored) else {
            return false;
        };
        let Ok(expected) = hex::decode(parsed.hex) else {
            return false;
        };
        if expected.len() != KEY_LENGTH {
            return false;
        }
        let actual = derive(password, parsed.salt, parsed.iterations);
        actual.as_slice().ct_eq(expected.as_slice()).into()
    }
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; KEY_LENGTH] {
    let mut out = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}

struct ParsedHash<'a> {
    iterations: u32,
    salt: &'a str,
    hex: &'a str,
}

impl<'a> ParsedHash<'a> {
    /// Accepts `pbkdf2`, `pbkdf2:sha256` and `pbkdf2:sha256:<n>` method prefixes.
    fn parse(stored: &'a str) -> Option<Self> {
        let mut parts = stored.splitn(3, '$');
        let method = parts.next()?;
        let salt = parts.next()?;
        let hex = parts.next()?;

        let mut method_parts = method.split(':');
        if method_parts.next()? != "pbkdf2" {
            return None;
        }
        let hash_name = method_parts.next().unwrap_or("sha256");
        if hash_name != "sha256" {
            return None;
        }
        let iterations = match method_parts.next() {
            Some(n) => n.parse().ok().filter(|n: &u32| *n > 0)?,
            None => DEFAULT_ITERATIONS,
        };
        if method_parts.next().is_some() {
            return None;
        }

        Some(Self {
            iterations,
            salt,
            hex,
        })
    }
}
