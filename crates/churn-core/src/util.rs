use std::time::Instant;

#[inline]
pub fn now_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `0.8712` -> `"87.12%"`
#[inline]
pub fn percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}
