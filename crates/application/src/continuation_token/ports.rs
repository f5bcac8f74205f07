use actionhub_core::AppResult;

/// Port for the authenticated cipher behind continuation tokens.
pub trait SecretEncryptor: Send + Sync {
    /// Encrypts and authenticates `plaintext`.
    fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>>;

    /// Verifies and decrypts a blob produced by [`SecretEncryptor::encrypt`].
    fn decrypt(&self, ciphertext: &[u8]) -> AppResult<Vec<u8>>;
}
