use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Length of every generated key.
pub const PUSH_KEY_LEN: usize = TIME_CHARS + RANDOM_CHARS;

#[derive(Debug, Default)]
struct PushState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

/// Generator of push keys.  Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    state: Mutex<PushState>,
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key stamped with the current wall-clock time.
    pub fn next_key(&self) -> String {
        self.next_key_at(Utc::now().timestamp_millis())
    }

    /// Generate a key stamped with `millis`.
    ///
    /// A clock that moves backwards is clamped to the last stamp so ordering
    /// holds across the jump.
    pub fn next_key_at(&self, millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let millis = millis.max(state.last_millis);
        if millis == state.last_millis && state.last_millis != 0 {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }
        state.last_millis = millis;

        let mut key = [0u8; PUSH_KEY_LEN];
        let mut remaining = millis.max(0) as u64;
        for i in (0..TIME_CHARS).rev() {
            key[i] = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        for (i, digit) in state.last_random.iter().enumerate() {
            key[TIME_CHARS + i] = PUSH_CHARS[*digit as usize];
        }

        // PUSH_CHARS is pure ASCII.
        key.iter().map(|&b| b as char).collect()
    }
}

/// Add one to a base-64 digit string, carrying leftwards.
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
