//! Document id generation
//!
//! Ids are 21 lowercase base36 characters:
//!
//! ```text
//! ┌──────────────┬─────────────┬──────────────┐
//! │ millis (9)   │ counter (4) │ random (8)   │
//! └──────────────┴─────────────┴──────────────┘
//! ```
//!
//! The counter is process-wide, so two ids from one process only collide
//! after 36^4 ids within the same millisecond. Across processes the random
//! tail keeps collisions unlikely but not impossible.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const MILLIS_WIDTH: usize = 9;
const COUNTER_WIDTH: usize = 4;
const RANDOM_WIDTH: usize = 8;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new document id
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt: u64 = rand::thread_rng().gen_range(0..36u64.pow(RANDOM_WIDTH as u32));

    let mut id = String::with_capacity(MILLIS_WIDTH + COUNTER_WIDTH + RANDOM_WIDTH);
    push_base36(&mut id, millis, MILLIS_WIDTH);
    push_base36(&mut id, sequence, COUNTER_WIDTH);
    push_base36(&mut id, salt, RANDOM_WIDTH);
    id
}

/// Append the low `width` base36 digits of `n`, zero padded
fn push_base36(out: &mut String, mut n: u64, width: usize) {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    out.extend(digits.into_iter().map(char::from));
}
