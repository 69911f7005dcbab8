use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};
use rand::{distributions::Alphanumeric, Rng};

use super::Error;

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 20;

/// One-way password hashing and verification.
///
/// Hashes are PHC strings, so the salt and parameters travel with the hash.
#[derive(Clone, Default)]
pub struct Encryptor {
	hasher: Argon2<'static>,
}

impl Encryptor {
	pub fn new(hasher: Argon2<'static>) -> Self {
		Self { hasher }
	}

	pub fn hash(&self, password: &str) -> Result<String, Error> {
		let salt = SaltString::generate(&mut OsRng);

		Ok(self
			.hasher
			.hash_password(password.as_bytes(), &salt)?
			.to_string())
	}

	/// Whether `password` produces `hash`. A malformed hash never matches.
	pub fn verify(&self, password: &str, hash: &str) -> bool {
		PasswordHash::new(hash).is_ok_and(|hash| {
			self.hasher
				.verify_password(password.as_bytes(), &hash)
				.is_ok()
		})
	}
}

/// 8 to 20 ASCII letters and digits, with at least one of each.
pub fn is_valid(password: &str) -> bool {
	(MIN_LENGTH..=MAX_LENGTH).contains(&password.len())
		&& password.chars().all(|c| c.is_ascii_alphanumeric())
		&& password.chars().any(|c| c.is_ascii_alphabetic())
		&& password.chars().any(|c| c.is_ascii_digit())
}

/// Generates a random password that satisfies [`is_valid`].
pub fn generate() -> String {
	let mut rng = rand::thread_rng();

	loop {
		let password = (&mut rng)
			.sample_iter(&Alphanumeric)
			.take(12)
			.map(char::from)
			.collect::<String>();

		if is_valid(&password) {
			return password;
		}
	}
}
