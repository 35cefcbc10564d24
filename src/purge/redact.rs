//! Secret masking for log output.

const VISIBLE_PREFIX: usize = 4;
const VISIBLE_SUFFIX: usize = 2;

/// Mask a secret, keeping a 4-char prefix and 2-char suffix.
pub fn redact(secret: &str) -> String {
    redact_with(secret, VISIBLE_PREFIX, VISIBLE_SUFFIX)
}

/// Mask the interior of `secret`. Secrets too short to keep both ends are fully masked.
pub fn redact_with(secret: &str, prefix: usize, suffix: usize) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    if len <= prefix + suffix {
        return "*".repeat(len);
    }

    let mut out = String::with_capacity(secret.len());
    out.extend(&chars[..prefix]);
    out.push_str(&"*".repeat(len - prefix - suffix));
    out.extend(&chars[len - suffix..]);
    out
}
