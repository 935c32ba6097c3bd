//! Password policy merging, validation and generation.
//!
//! Policies from several sources (global, per role, per resource) merge
//! into one effective specification before a password is generated.
//! Generation is a best-effort local repair over a random candidate, not
//! a constraint solver; contradictory specifications are rejected up
//! front by [`validate_policy`].

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Maximum length seed for merging: any real policy maximum undercuts it.
const MERGE_MAX_SEED: usize = 1000;

/// Special characters eligible for non-alphanumeric injection.
const SPECIAL_CHARS: &[char] = &['!', '%', '&', '(', ')', '?', '#', '_', '$'];

/// A password policy specification.
///
/// `must_*` and `mustnt_*` flags constrain the first and last character;
/// the `*_required` flags constrain content anywhere in the password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicySpec {
    pub min_length: usize,
    pub max_length: usize,

    pub alphanumeric_required: bool,
    pub digit_required: bool,
    pub lowercase_required: bool,
    pub uppercase_required: bool,
    pub non_alphanumeric_required: bool,

    pub must_start_with_alpha: bool,
    pub mustnt_start_with_alpha: bool,
    pub must_start_with_digit: bool,
    pub mustnt_start_with_digit: bool,
    pub must_start_with_non_alpha: bool,
    pub mustnt_start_with_non_alpha: bool,

    pub must_end_with_alpha: bool,
    pub mustnt_end_with_alpha: bool,
    pub must_end_with_digit: bool,
    pub mustnt_end_with_digit: bool,
    pub must_end_with_non_alpha: bool,
    pub mustnt_end_with_non_alpha: bool,

    pub prefixes_not_permitted: Vec<String>,
    pub suffixes_not_permitted: Vec<String>,
}

/// A merged policy that cannot produce any password.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyConflict {
    /// No policy contributed a minimum length.
    #[error("merged minimum length is zero")]
    ZeroMinLength,

    /// The strictest minimum exceeds the strictest maximum.
    #[error("minimum length {min} exceeds maximum length {max}")]
    LengthContradiction { min: usize, max: usize },

    /// Two boundary flags that no character can satisfy at once.
    #[error("incompatible password policy flags: {first} and {second}")]
    Contradiction {
        first: &'static str,
        second: &'static str,
    },
}

/// Merge several policies into the strictest combination.
///
/// Minimum length is the maximum across policies; maximum length is the
/// minimum across non-zero maxima (seeded at 1000). Every boolean flag is
/// OR-combined. The prefix and suffix ban lists are OVERWRITTEN by each
/// policy in turn, so the last policy in the slice wins; this mirrors the
/// behavior callers have relied on since the ban lists were introduced.
#[must_use]
pub fn merge_policies(policies: &[PasswordPolicySpec]) -> PasswordPolicySpec {
    let mut merged = PasswordPolicySpec {
        max_length: MERGE_MAX_SEED,
        ..PasswordPolicySpec::default()
    };

    for policy in policies {
        if policy.min_length > merged.min_length {
            merged.min_length = policy.min_length;
        }
        if policy.max_length != 0 && policy.max_length < merged.max_length {
            merged.max_length = policy.max_length;
        }

        merged.prefixes_not_permitted = policy.prefixes_not_permitted.clone();
        merged.suffixes_not_permitted = policy.suffixes_not_permitted.clone();

        merged.alphanumeric_required |= policy.alphanumeric_required;
        merged.digit_required |= policy.digit_required;
        merged.lowercase_required |= policy.lowercase_required;
        merged.uppercase_required |= policy.uppercase_required;
        merged.non_alphanumeric_required |= policy.non_alphanumeric_required;

        merged.must_start_with_alpha |= policy.must_start_with_alpha;
        merged.mustnt_start_with_alpha |= policy.mustnt_start_with_alpha;
        merged.must_start_with_digit |= policy.must_start_with_digit;
        merged.mustnt_start_with_digit |= policy.mustnt_start_with_digit;
        merged.must_start_with_non_alpha |= policy.must_start_with_non_alpha;
        merged.mustnt_start_with_non_alpha |= policy.mustnt_start_with_non_alpha;

        merged.must_end_with_alpha |= policy.must_end_with_alpha;
        merged.mustnt_end_with_alpha |= policy.mustnt_end_with_alpha;
        merged.must_end_with_digit |= policy.must_end_with_digit;
        merged.mustnt_end_with_digit |= policy.mustnt_end_with_digit;
        merged.must_end_with_non_alpha |= policy.must_end_with_non_alpha;
        merged.mustnt_end_with_non_alpha |= policy.mustnt_end_with_non_alpha;
    }

    merged
}

/// Check a merged policy for contradictions. Fails on the first violation.
pub fn validate_policy(spec: &PasswordPolicySpec) -> Result<(), PolicyConflict> {
    if spec.min_length == 0 {
        error!("password policy has zero minimum length");
        return Err(PolicyConflict::ZeroMinLength);
    }

    let pairs: [(bool, &'static str, bool, &'static str); 6] = [
        (
            spec.must_end_with_alpha,
            "must_end_with_alpha",
            spec.mustnt_end_with_alpha,
            "mustnt_end_with_alpha",
        ),
        (
            spec.must_end_with_alpha,
            "must_end_with_alpha",
            spec.must_end_with_digit,
            "must_end_with_digit",
        ),
        (
            spec.must_end_with_digit,
            "must_end_with_digit",
            spec.mustnt_end_with_digit,
            "mustnt_end_with_digit",
        ),
        (
            spec.must_end_with_non_alpha,
            "must_end_with_non_alpha",
            spec.mustnt_end_with_non_alpha,
            "mustnt_end_with_non_alpha",
        ),
        (
            spec.must_start_with_alpha,
            "must_start_with_alpha",
            spec.mustnt_start_with_alpha,
            "mustnt_start_with_alpha",
        ),
        (
            spec.must_start_with_alpha,
            "must_start_with_alpha",
            spec.must_start_with_digit,
            "must_start_with_digit",
        ),
    ];
    for (a, a_name, b, b_name) in pairs {
        if a && b {
            error!(first = a_name, second = b_name, "incompatible password policy flags");
            return Err(PolicyConflict::Contradiction {
                first: a_name,
                second: b_name,
            });
        }
    }
    if spec.must_start_with_digit && spec.mustnt_start_with_digit {
        error!("incompatible password policy flags: must_start_with_digit and mustnt_start_with_digit");
        return Err(PolicyConflict::Contradiction {
            first: "must_start_with_digit",
            second: "mustnt_start_with_digit",
        });
    }
    if spec.must_start_with_non_alpha && spec.mustnt_start_with_non_alpha {
        error!("incompatible password policy flags: must_start_with_non_alpha and mustnt_start_with_non_alpha");
        return Err(PolicyConflict::Contradiction {
            first: "must_start_with_non_alpha",
            second: "mustnt_start_with_non_alpha",
        });
    }

    if spec.min_length > spec.max_length {
        error!(
            min = spec.min_length,
            max = spec.max_length,
            "password policy minimum length exceeds maximum"
        );
        return Err(PolicyConflict::LengthContradiction {
            min: spec.min_length,
            max: spec.max_length,
        });
    }

    Ok(())
}

/// Generate a password satisfying a single merged policy.
///
/// Validates first, then repairs a random candidate of `min_length`
/// characters in a fixed order: content requirements at distinct interior
/// positions, then boundary flags, then a re-repair of boundaries that
/// still match a forbidden prefix or suffix.
pub fn generate_password(spec: &PasswordPolicySpec) -> Result<String, PolicyConflict> {
    validate_policy(spec)?;

    let mut rng = thread_rng();
    let len = spec.min_length;

    let mut password: Vec<char> = if spec.digit_required || spec.alphanumeric_required {
        random_alphanumeric(len).chars().collect()
    } else {
        (0..len).map(|_| random_alpha(&mut rng)).collect()
    };

    // Every required content class claims its own interior slot, whether
    // or not the candidate already satisfies it. Slots are distinct and
    // exclude both boundary positions, so neither a later injection nor a
    // boundary repair can overwrite the character guaranteeing a class.
    let mut slots: Vec<usize> = (1..len.saturating_sub(1)).collect();
    slots.shuffle(&mut rng);

    if spec.digit_required {
        let at = slots.pop().unwrap_or(0);
        password[at] = random_digit(&mut rng);
    }
    if spec.uppercase_required {
        let at = slots.pop().unwrap_or(0);
        password[at] = random_upper(&mut rng);
    }
    if spec.lowercase_required {
        let at = slots.pop().unwrap_or(0);
        password[at] = random_lower(&mut rng);
    }
    if spec.non_alphanumeric_required {
        let at = slots.pop().unwrap_or(0);
        password[at] = random_special(&mut rng);
    }

    repair_start(&mut password, spec, &mut rng);
    repair_end(&mut password, spec, &mut rng);

    let as_string: String = password.iter().collect();
    for prefix in &spec.prefixes_not_permitted {
        if as_string.starts_with(prefix.as_str()) {
            repair_start(&mut password, spec, &mut rng);
            break;
        }
    }
    let as_string: String = password.iter().collect();
    for suffix in &spec.suffixes_not_permitted {
        if as_string.ends_with(suffix.as_str()) {
            repair_end(&mut password, spec, &mut rng);
            break;
        }
    }

    Ok(password.iter().collect())
}

/// Merge, validate and generate in one step. The public entry point for
/// callers holding a policy set.
pub fn generate_from_policies(
    policies: &[PasswordPolicySpec],
) -> Result<String, PolicyConflict> {
    generate_password(&merge_policies(policies))
}

/// A random alphanumeric string. Callers use this as the fallback when
/// policy-driven generation is impossible.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn repair_start(password: &mut [char], spec: &PasswordPolicySpec, rng: &mut impl Rng) {
    if password.is_empty() {
        return;
    }
    if spec.must_start_with_alpha {
        password[0] = random_alpha(rng);
    }
    if spec.must_start_with_non_alpha || spec.must_start_with_digit {
        password[0] = random_digit(rng);
    }
    if spec.mustnt_start_with_alpha {
        password[0] = random_digit(rng);
    }
    if spec.mustnt_start_with_digit && password[0].is_ascii_digit() {
        password[0] = random_alpha(rng);
    }
    if spec.mustnt_start_with_non_alpha && !password[0].is_ascii_alphanumeric() {
        password[0] = random_alpha(rng);
    }
}

fn repair_end(password: &mut [char], spec: &PasswordPolicySpec, rng: &mut impl Rng) {
    let Some(last) = password.len().checked_sub(1) else {
        return;
    };
    if spec.must_end_with_alpha {
        password[last] = random_alpha(rng);
    }
    if spec.must_end_with_non_alpha || spec.must_end_with_digit {
        password[last] = random_digit(rng);
    }
    if spec.mustnt_end_with_alpha {
        password[last] = random_digit(rng);
    }
    if spec.mustnt_end_with_digit && password[last].is_ascii_digit() {
        password[last] = random_alpha(rng);
    }
    if spec.mustnt_end_with_non_alpha && !password[last].is_ascii_alphanumeric() {
        password[last] = random_alpha(rng);
    }
}

fn random_digit(rng: &mut impl Rng) -> char {
    rng.gen_range(b'0'..=b'9') as char
}

fn random_upper(rng: &mut impl Rng) -> char {
    rng.gen_range(b'A'..=b'Z') as char
}

fn random_lower(rng: &mut impl Rng) -> char {
    rng.gen_range(b'a'..=b'z') as char
}

fn random_alpha(rng: &mut impl Rng) -> char {
    if rng.gen_bool(0.5) {
        random_upper(rng)
    } else {
        random_lower(rng)
    }
}

fn random_special(rng: &mut impl Rng) -> char {
    SPECIAL_CHARS[rng.gen_range(0..SPECIAL_CHARS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_lengths(min: usize, max: usize) -> PasswordPolicySpec {
        PasswordPolicySpec {
            min_length: min,
            max_length: max,
            ..PasswordPolicySpec::default()
        }
    }

    #[test]
    fn test_merge_singleton_idempotent() {
        let spec = PasswordPolicySpec {
            min_length: 8,
            max_length: 20,
            digit_required: true,
            mustnt_start_with_digit: true,
            prefixes_not_permitted: vec!["admin".to_string()],
            ..PasswordPolicySpec::default()
        };
        assert_eq!(merge_policies(&[spec.clone()]), spec);
    }

    #[test]
    fn test_merge_lengths() {
        let merged = merge_policies(&[spec_with_lengths(6, 30), spec_with_lengths(10, 16)]);
        assert_eq!(merged.min_length, 10);
        assert_eq!(merged.max_length, 16);

        // a zero maximum never tightens the merged maximum
        let merged = merge_policies(&[spec_with_lengths(8, 0)]);
        assert_eq!(merged.max_length, MERGE_MAX_SEED);
    }

    #[test]
    fn test_merge_flags_are_or_combined() {
        let a = PasswordPolicySpec {
            min_length: 8,
            digit_required: true,
            ..PasswordPolicySpec::default()
        };
        let b = PasswordPolicySpec {
            min_length: 8,
            uppercase_required: true,
            mustnt_end_with_digit: true,
            ..PasswordPolicySpec::default()
        };
        let merged = merge_policies(&[a, b]);
        assert!(merged.digit_required);
        assert!(merged.uppercase_required);
        assert!(merged.mustnt_end_with_digit);
    }

    #[test]
    fn test_merge_ban_lists_last_wins() {
        let a = PasswordPolicySpec {
            min_length: 8,
            prefixes_not_permitted: vec!["root".to_string()],
            suffixes_not_permitted: vec!["123".to_string()],
            ..PasswordPolicySpec::default()
        };
        let b = PasswordPolicySpec {
            min_length: 8,
            prefixes_not_permitted: vec!["admin".to_string()],
            ..PasswordPolicySpec::default()
        };
        let merged = merge_policies(&[a, b]);
        assert_eq!(merged.prefixes_not_permitted, vec!["admin".to_string()]);
        assert!(merged.suffixes_not_permitted.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_min() {
        assert_eq!(
            validate_policy(&spec_with_lengths(0, 10)),
            Err(PolicyConflict::ZeroMinLength)
        );
    }

    #[test]
    fn test_validate_rejects_min_over_max() {
        assert_eq!(
            validate_policy(&spec_with_lengths(12, 8)),
            Err(PolicyConflict::LengthContradiction { min: 12, max: 8 })
        );
    }

    #[test]
    fn test_validate_rejects_each_contradiction_pair() {
        let base = spec_with_lengths(8, 20);
        let cases: Vec<(PasswordPolicySpec, &str, &str)> = vec![
            (
                PasswordPolicySpec {
                    must_end_with_alpha: true,
                    mustnt_end_with_alpha: true,
                    ..base.clone()
                },
                "must_end_with_alpha",
                "mustnt_end_with_alpha",
            ),
            (
                PasswordPolicySpec {
                    must_end_with_alpha: true,
                    must_end_with_digit: true,
                    ..base.clone()
                },
                "must_end_with_alpha",
                "must_end_with_digit",
            ),
            (
                PasswordPolicySpec {
                    must_end_with_digit: true,
                    mustnt_end_with_digit: true,
                    ..base.clone()
                },
                "must_end_with_digit",
                "mustnt_end_with_digit",
            ),
            (
                PasswordPolicySpec {
                    must_end_with_non_alpha: true,
                    mustnt_end_with_non_alpha: true,
                    ..base.clone()
                },
                "must_end_with_non_alpha",
                "mustnt_end_with_non_alpha",
            ),
            (
                PasswordPolicySpec {
                    must_start_with_alpha: true,
                    mustnt_start_with_alpha: true,
                    ..base.clone()
                },
                "must_start_with_alpha",
                "mustnt_start_with_alpha",
            ),
            (
                PasswordPolicySpec {
                    must_start_with_alpha: true,
                    must_start_with_digit: true,
                    ..base.clone()
                },
                "must_start_with_alpha",
                "must_start_with_digit",
            ),
            (
                PasswordPolicySpec {
                    must_start_with_digit: true,
                    mustnt_start_with_digit: true,
                    ..base.clone()
                },
                "must_start_with_digit",
                "mustnt_start_with_digit",
            ),
            (
                PasswordPolicySpec {
                    must_start_with_non_alpha: true,
                    mustnt_start_with_non_alpha: true,
                    ..base.clone()
                },
                "must_start_with_non_alpha",
                "mustnt_start_with_non_alpha",
            ),
        ];

        for (spec, first, second) in cases {
            assert_eq!(
                validate_policy(&spec),
                Err(PolicyConflict::Contradiction { first, second }),
                "expected {first}+{second} to be rejected"
            );
        }
    }

    #[test]
    fn test_generate_satisfies_content_and_boundary_flags() {
        let spec = PasswordPolicySpec {
            min_length: 10,
            max_length: 20,
            digit_required: true,
            uppercase_required: true,
            lowercase_required: true,
            non_alphanumeric_required: true,
            mustnt_start_with_digit: true,
            ..PasswordPolicySpec::default()
        };

        for _ in 0..50 {
            let password = generate_password(&spec).unwrap();
            assert_eq!(password.chars().count(), 10);
            assert!(password.chars().any(|c| c.is_ascii_digit()), "{password}");
            assert!(
                password.chars().any(|c| c.is_ascii_uppercase()),
                "{password}"
            );
            assert!(
                password.chars().any(|c| c.is_ascii_lowercase()),
                "{password}"
            );
            assert!(
                password.chars().any(|c| !c.is_ascii_alphanumeric()),
                "{password}"
            );
            let first = password.chars().next().unwrap();
            assert!(!first.is_ascii_digit(), "{password}");
        }
    }

    #[test]
    fn test_generate_keeps_every_required_class_across_injections() {
        // a digit present in the random candidate must survive the
        // uppercase injection that follows it
        let spec = PasswordPolicySpec {
            min_length: 8,
            max_length: 20,
            digit_required: true,
            uppercase_required: true,
            ..PasswordPolicySpec::default()
        };

        for _ in 0..500 {
            let password = generate_password(&spec).unwrap();
            assert!(password.chars().any(|c| c.is_ascii_digit()), "{password}");
            assert!(
                password.chars().any(|c| c.is_ascii_uppercase()),
                "{password}"
            );
        }
    }

    #[test]
    fn test_generate_end_flags() {
        let spec = PasswordPolicySpec {
            min_length: 8,
            max_length: 20,
            must_end_with_digit: true,
            must_start_with_alpha: true,
            ..PasswordPolicySpec::default()
        };

        for _ in 0..20 {
            let password = generate_password(&spec).unwrap();
            assert!(password.chars().last().unwrap().is_ascii_digit());
            assert!(password.chars().next().unwrap().is_ascii_alphabetic());
        }
    }

    #[test]
    fn test_conflict_detected_before_generation() {
        let spec = PasswordPolicySpec {
            min_length: 8,
            max_length: 20,
            must_start_with_digit: true,
            mustnt_start_with_digit: true,
            ..PasswordPolicySpec::default()
        };
        assert!(matches!(
            generate_password(&spec),
            Err(PolicyConflict::Contradiction { .. })
        ));
    }

    #[test]
    fn test_generate_from_policies_merges_first() {
        let a = PasswordPolicySpec {
            min_length: 6,
            ..PasswordPolicySpec::default()
        };
        let b = PasswordPolicySpec {
            min_length: 12,
            digit_required: true,
            ..PasswordPolicySpec::default()
        };
        let password = generate_from_policies(&[a, b]).unwrap();
        assert_eq!(password.chars().count(), 12);
        assert!(password.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_from_empty_policies_is_zero_min() {
        assert_eq!(
            generate_from_policies(&[]),
            Err(PolicyConflict::ZeroMinLength)
        );
    }

    #[test]
    fn test_random_alphanumeric() {
        let s = random_alphanumeric(16);
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
