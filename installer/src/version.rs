//! Version comparison.
//!
//! Both the extension release tags and `PHP_VERSION` strings are compared
//! here. PHP versions are not always strict semver (`7.4`, `8.1.2RC1`), so
//! parsing pads missing components, maps PHP's `dev`/`alpha`/`beta`/`RC`
//! suffixes onto pre-releases, and otherwise keeps the leading numeric triple
//! before giving up and comparing strings.

use regex::Regex;
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Three-way comparison of two version strings.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use ton_client_installer::version::compare_versions;
///
/// assert_eq!(compare_versions("1.2.3", "1.2.2"), Ordering::Greater);
/// assert_eq!(compare_versions("7.4", "7.4.0"), Ordering::Equal);
/// assert_eq!(compare_versions("v1.0.0", "1.10.0"), Ordering::Less);
/// assert_eq!(compare_versions("8.1.2RC1", "8.1.2"), Ordering::Less);
/// ```
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    match (parse_lenient(left), parse_lenient(right)) {
        (Some(l), Some(r)) => l.cmp_precedence(&r),
        _ => left.trim().cmp(right.trim()),
    }
}

/// Returns true when `target` should replace `installed`.
///
/// # Examples
///
/// ```
/// use ton_client_installer::version::should_install;
///
/// assert!(should_install("1.2.3", Some("1.2.2"), false));
/// assert!(!should_install("1.2.3", Some("1.2.3"), false));
/// assert!(should_install("1.2.3", Some("1.2.3"), true));
/// assert!(should_install("1.2.3", None, false));
/// ```
#[must_use]
pub fn should_install(target: &str, installed: Option<&str>, force: bool) -> bool {
    match installed {
        None => true,
        Some(installed) => force || compare_versions(target, installed) == Ordering::Greater,
    }
}

fn parse_lenient(raw: &str) -> Option<Version> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let trimmed = raw.trim().trim_start_matches('v');
    let re = PATTERN
        .get_or_init(|| {
            Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[-_.]?([A-Za-z]+)\.?(\d*))?").ok()
        })
        .as_ref()?;
    let caps = re.captures(trimmed)?;
    let component = |index: usize| -> Option<u64> {
        caps.get(index)
            .map_or(Some(0), |m| m.as_str().parse().ok())
    };
    let mut version = Version::new(component(1)?, component(2)?, component(3)?);
    if let Some(label) = caps.get(4) {
        let number = caps.get(5).map_or("", |m| m.as_str());
        version.pre = pre_release(label.as_str(), number).unwrap_or(Prerelease::EMPTY);
    }
    Some(version)
}

/// Map a PHP-style suffix onto a pre-release ordered `dev < alpha < beta < RC`.
///
/// Other suffixes (`pl`, distro tags) do not affect ordering.
fn pre_release(label: &str, number: &str) -> Option<Prerelease> {
    let rank = match label.to_ascii_lowercase().as_str() {
        "dev" => 0,
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "rc" => 3,
        _ => return None,
    };
    let number: u64 = if number.is_empty() { 0 } else { number.parse().ok()? };
    Prerelease::new(&format!("{rank}.{number}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::newer_patch("1.2.3", "1.2.2", Ordering::Greater)]
    #[case::older_minor("1.1.9", "1.2.0", Ordering::Less)]
    #[case::equal("1.2.3", "1.2.3", Ordering::Equal)]
    #[case::numeric_not_lexical("1.10.0", "1.9.0", Ordering::Greater)]
    #[case::padded("7.4", "7.4.0", Ordering::Equal)]
    #[case::release_candidate_before_release("8.1.2RC1", "8.1.2", Ordering::Less)]
    #[case::beta_before_release_candidate("1.2.3beta2", "1.2.3RC1", Ordering::Less)]
    #[case::release_candidates_numbered("1.2.3RC2", "1.2.3RC1", Ordering::Greater)]
    #[case::dev_before_alpha("8.2.0-dev", "8.2.0alpha1", Ordering::Less)]
    #[case::unknown_suffix_ignored("7.4.33pl1", "7.4.33", Ordering::Equal)]
    #[case::distro_build("7.4.3-4ubuntu2.19", "7.4", Ordering::Greater)]
    #[case::leading_v("v1.0.0", "1.0.0", Ordering::Equal)]
    #[case::fallback_strings("abc", "abd", Ordering::Less)]
    fn compare_versions_orders(
        #[case] left: &str,
        #[case] right: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare_versions(left, right), expected);
    }

    #[rstest]
    #[case::same("1.2.3", "1.2.3")]
    #[case::older_target("1.2.2", "1.2.3")]
    #[case::much_older_target("0.9.0", "1.0.0")]
    fn should_install_is_monotonic_without_force(#[case] target: &str, #[case] installed: &str) {
        assert!(!should_install(target, Some(installed), false));
        assert!(should_install(target, Some(installed), true));
    }

    #[test]
    fn release_replaces_installed_release_candidate() {
        assert!(should_install("1.2.3", Some("1.2.3RC1"), false));
    }
}
