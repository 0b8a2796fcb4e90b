use std::sync::Arc;
use tinyrand::RandRange;
use tinyrand_std::thread_rand;

/// Uppercase letters and digits without the easily confused `I`, `O`, `0`, `1`.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CONNECTION_ID_LEN: usize = 10;

/// Random id of `length` characters drawn from [`ALPHABET`].
pub fn random_id(length: usize) -> Arc<str> {
    let mut rng = thread_rand();
    let id: String = (0..length)
        .map(|_| ALPHABET[rng.next_range(0..ALPHABET.len())] as char)
        .collect();
    Arc::from(id)
}

pub fn connection_id() -> Arc<str> {
    random_id(CONNECTION_ID_LEN)
}
