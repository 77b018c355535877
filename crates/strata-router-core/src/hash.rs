//! 64-bit mixing hash used by the server-side partitioner.
//!
//! This is Bob Jenkins' 64-bit `lookup8` construction with the partitioner's
//! initial value. The client has to reproduce it bit for bit: any divergence
//! sends every request to the wrong replica set.
//!
//! Input bytes are read as little-endian 64-bit words regardless of the host
//! byte order. All arithmetic wraps modulo 2^64.

/// Initial value of the `a` and `b` accumulators
const GOLDEN_RATIO: u64 = 0xe08c1d668b756f82;

#[inline(always)]
fn mix(a: &mut u64, b: &mut u64, c: &mut u64) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c);
    *a ^= *c >> 43;
    *b = b.wrapping_sub(*c).wrapping_sub(*a);
    *b ^= *a << 9;
    *c = c.wrapping_sub(*a).wrapping_sub(*b);
    *c ^= *b >> 8;
    *a = a.wrapping_sub(*b).wrapping_sub(*c);
    *a ^= *c >> 38;
    *b = b.wrapping_sub(*c).wrapping_sub(*a);
    *b ^= *a << 23;
    *c = c.wrapping_sub(*a).wrapping_sub(*b);
    *c ^= *b >> 5;
    *a = a.wrapping_sub(*b).wrapping_sub(*c);
    *a ^= *c >> 35;
    *b = b.wrapping_sub(*c).wrapping_sub(*a);
    *b ^= *a << 49;
    *c = c.wrapping_sub(*a).wrapping_sub(*b);
    *c ^= *b >> 11;
    *a = a.wrapping_sub(*b).wrapping_sub(*c);
    *a ^= *c >> 12;
    *b = b.wrapping_sub(*c).wrapping_sub(*a);
    *b ^= *a << 18;
    *c = c.wrapping_sub(*a).wrapping_sub(*b);
    *c ^= *b >> 22;
}

#[inline(always)]
fn word_at(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}

/// Partial little-endian word of up to 7 bytes, shifted left by `shift` bits
#[inline(always)]
fn partial_word(bytes: &[u8], shift: u32) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &byte)| acc.wrapping_add((byte as u64) << (shift + 8 * i as u32)))
}

/// Hash `bytes` with `seed`.
///
/// ```
/// use strata_router_core::hash::hash64;
/// assert_eq!(hash64(&[], 97), 0xc505_b216_9290_9bd5);
/// ```
pub fn hash64(bytes: &[u8], seed: u64) -> u64 {
    let mut a = GOLDEN_RATIO;
    let mut b = GOLDEN_RATIO;
    let mut c = seed;

    let mut chunks = bytes.chunks_exact(24);
    for chunk in &mut chunks {
        a = a.wrapping_add(word_at(chunk, 0));
        b = b.wrapping_add(word_at(chunk, 8));
        c = c.wrapping_add(word_at(chunk, 16));
        mix(&mut a, &mut b, &mut c);
    }

    c = c.wrapping_add(bytes.len() as u64);

    // The low byte of `c` already holds the length, so tail bytes 17..23
    // start at bit 8.
    let tail = chunks.remainder();
    match tail.len() {
        0 => {}
        1..=7 => {
            a = a.wrapping_add(partial_word(tail, 0));
        }
        8 => {
            a = a.wrapping_add(word_at(tail, 0));
        }
        9..=15 => {
            a = a.wrapping_add(word_at(tail, 0));
            b = b.wrapping_add(partial_word(&tail[8..], 0));
        }
        16 => {
            a = a.wrapping_add(word_at(tail, 0));
            b = b.wrapping_add(word_at(tail, 8));
        }
        _ => {
            a = a.wrapping_add(word_at(tail, 0));
            b = b.wrapping_add(word_at(tail, 8));
            c = c.wrapping_add(partial_word(&tail[16..], 8));
        }
    }

    mix(&mut a, &mut b, &mut c);
    c
}
