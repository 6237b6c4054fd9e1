//! Identity-key derivation.
//!
//! The identity key is the only handle used to match applications across
//! scans and to attach groups, so this is the single place it is computed.
//! The noise rules are data (`IdentityRules`) and carry a version number;
//! changing any list below requires bumping [`IDENTITY_RULES_VERSION`],
//! because stored group assignments are keyed by the output.

use std::sync::LazyLock;

use regex::Regex;

/// Version of the rule set returned by [`IdentityRules::current`].
pub const IDENTITY_RULES_VERSION: u32 = 1;

/// Version-number tokens: `1.2`, `v3.11.4`, `19.00`, `2.0.1-beta`, `10.0.19041.1`.
static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?\d+(?:\.\d+)+(?:[-+_.]?[a-z0-9]+)*$").expect("VERSION_TOKEN must compile")
});

/// A parenthesised or bracketed group, e.g. `(x64)` or `[3.1 build]`.
static BRACKET_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(\[]([^()\[\]]*)[)\]]").expect("BRACKET_GROUP must compile"));

/// Explicit, versioned policy for turning display names into identity keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRules {
    pub version: u32,
    /// Substrings deleted anywhere in the case-folded name.
    pub symbols: &'static [&'static str],
    /// Whole tokens dropped after case folding.
    pub noise_tokens: &'static [&'static str],
    /// Tokens that introduce a version number (`version 2.0`).
    pub version_prefixes: &'static [&'static str],
    /// Punctuation-only tokens trimmed from the end.
    pub trailing_separators: &'static [&'static str],
}

const RULES_V1: IdentityRules = IdentityRules {
    version: 1,
    symbols: &["™", "®", "©", "(tm)", "(r)", "(c)"],
    noise_tokens: &[
        "x64", "x86", "x86_64", "amd64", "64-bit", "32-bit", "64bit", "32bit", "win64", "win32",
    ],
    version_prefixes: &["version", "ver", "ver."],
    trailing_separators: &["-", "–", "—", ":", ",", "|", "/"],
};

impl IdentityRules {
    /// The rule set every identity key in this build is computed with.
    pub fn current() -> &'static IdentityRules {
        &RULES_V1
    }

    fn is_version(&self, token: &str) -> bool {
        VERSION_TOKEN.is_match(token)
    }

    fn is_noise(&self, token: &str) -> bool {
        let bare = token.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | ',' | ';'));
        !bare.is_empty() && (self.noise_tokens.contains(&bare) || self.is_version(bare))
    }

    /// Derive the identity key for a display name.
    pub fn derive(&self, name: &str) -> String {
        let mut folded = name.to_lowercase();
        for symbol in self.symbols {
            folded = folded.replace(symbol, " ");
        }

        // Drop bracketed groups made only of noise: "(x64)", "(64-bit)", "[2.0]".
        let without_groups = BRACKET_GROUP.replace_all(&folded, |caps: &regex::Captures<'_>| {
            let inner = caps.get(1).map_or("", |m| m.as_str());
            let tokens: Vec<&str> = inner.split_whitespace().collect();
            if !tokens.is_empty() && tokens.iter().all(|t| self.is_noise(t)) {
                " ".to_string()
            } else {
                caps[0].to_string()
            }
        });

        let tokens: Vec<&str> = without_groups.split_whitespace().collect();
        let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
        let mut idx = 0;
        while idx < tokens.len() {
            let token = tokens[idx];
            let next_is_version = tokens.get(idx + 1).is_some_and(|next| self.is_noise(next));
            if self.version_prefixes.contains(&token) && next_is_version {
                idx += 2;
                continue;
            }
            if !self.is_noise(token) {
                kept.push(token);
            }
            idx += 1;
        }

        while kept.last().is_some_and(|t| self.trailing_separators.contains(t)) {
            kept.pop();
        }
        let mut key = kept.join(" ");
        while key.ends_with([',', ':', '-']) {
            key.pop();
            key.truncate(key.trim_end().len());
        }

        if key.is_empty() {
            // Everything was noise ("7-Zip 19.00" is fine, "1.0" alone is not):
            // fall back to the collapsed folded name so non-empty names never
            // share the empty key.
            return folded.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        key
    }
}

/// Identity key for `name` under the current rule set.
pub fn identity_key(name: &str) -> String {
    IdentityRules::current().derive(name)
}
