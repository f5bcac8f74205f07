//! Sealed, tamper-evident tokens that carry state through the caller.
//!
//! The hub keeps no session storage. Anything it must see again on a later
//! request (the OAuth return URL, negotiated provider tokens) is serialized,
//! encrypted with an authenticated cipher and handed to the caller as an opaque
//! URL-safe string.

mod codec;
mod ports;

pub use codec::{ContinuationTokenCodec, TOKEN_FORMAT_VERSION};
pub use ports::SecretEncryptor;
