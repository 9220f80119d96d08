//! Random helpers shared by the world and the host

use rand::Rng;

use super::time::unix_millis;

/// Uniform float in `[0, max)`; zero or negative ranges yield 0.
pub fn rand_f32<R: Rng + ?Sized>(rng: &mut R, max: f32) -> f32 {
    if max <= 0.0 || !max.is_finite() {
        return 0.0;
    }
    rng.gen_range(0.0..max)
}

/// Integer-valued float in `[0, max)`, the `floor(random * max)` used for
/// cooldown and damage jitter.
pub fn rand_int<R: Rng + ?Sized>(rng: &mut R, max: f32) -> f32 {
    rand_f32(rng, max).floor()
}

/// Short, mostly-unique identifier: base-32 timestamp plus a random suffix.
pub fn make_random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}-{}",
        to_base32(unix_millis()),
        to_base32(rng.gen_range(0..10_000))
    )
}

fn to_base32(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 32) as usize]);
        n /= 32;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
