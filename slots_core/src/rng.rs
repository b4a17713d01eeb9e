use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::symbols::{Symbol, REELS, SYMBOL_COUNT};

// Provably-fair draws:
// server_seed (secret) + client_seed + nonce -> HMAC-SHA256 -> bytes -> floats in [0,1)

pub type HmacSha256 = Hmac<Sha256>;

/// Produces the symbols of one round.
pub trait SymbolSource {
    fn draw(&mut self) -> [Symbol; REELS];
}

impl<S: SymbolSource + ?Sized> SymbolSource for Box<S> {
    fn draw(&mut self) -> [Symbol; REELS] {
        (**self).draw()
    }
}

/// Maps a float in [0,1) onto the symbol set, each symbol equally likely.
pub fn symbol_from_float(f: f64) -> Symbol {
    let idx = (f * SYMBOL_COUNT as f64).floor() as usize;
    Symbol::ALL[idx.min(SYMBOL_COUNT - 1)]
}

/// Independent uniform draws from the thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl SymbolSource for ThreadRngSource {
    fn draw(&mut self) -> [Symbol; REELS] {
        let mut rng = rand::thread_rng();
        std::array::from_fn(|_| Symbol::ALL[rng.gen_range(0..SYMBOL_COUNT)])
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

pub fn derive_floats(hmac_bytes: &[u8], count: usize) -> Vec<f64> {
    // Successive 4-byte chunks as big-endian u32, scaled to [0,1)
    let mut out = Vec::with_capacity(count);
    let mut buffer = hmac_bytes.to_vec();
    let mut i = 0usize;
    while out.len() < count {
        if i + 4 > buffer.len() {
            // extend deterministically by hashing the previous buffer
            buffer = Sha256::digest(&buffer).to_vec();
            i = 0;
            continue;
        }
        let v = u32::from_be_bytes([buffer[i], buffer[i + 1], buffer[i + 2], buffer[i + 3]]);
        out.push(v as f64 / (u32::MAX as f64 + 1.0));
        i += 4;
    }
    out
}

#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret
    pub client_seed: String,
    pub nonce: u64,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn hmac_bytes(&self) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(self.server_seed.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{}:{}", self.client_seed, self.nonce).as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    pub fn next_floats(&self, count: usize) -> Vec<f64> {
        derive_floats(&self.hmac_bytes(), count)
    }

    /// Symbols for the current nonce, without advancing it.
    pub fn symbols(&self) -> [Symbol; REELS] {
        let floats = self.next_floats(REELS);
        std::array::from_fn(|i| symbol_from_float(floats[i]))
    }
}

impl SymbolSource for ProvablyFairRng {
    fn draw(&mut self) -> [Symbol; REELS] {
        let symbols = self.symbols();
        self.nonce += 1;
        symbols
    }
}

/// Recomputes the draw for a revealed server seed and checks it against a reported line.
pub fn verify_draw(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    expected: &[Symbol; REELS],
) -> bool {
    ProvablyFairRng::new(server_seed, client_seed, nonce).symbols() == *expected
}
