//! Device name inference
//!
//! An ordered rule table evaluated against the lower-cased `userAgent`.
//! The first matching rule names the device. When nothing matches, the
//! `platform` field is used, and failing that the generic [`FALLBACK_NAME`].

use super::info::DeviceInfo;

/// Name given to a tracker before any device metadata arrives
pub const UNKNOWN_DEVICE: &str = "Unknown device";

/// Name used when neither the user agent nor the platform says anything
pub const FALLBACK_NAME: &str = "Device";

/// Substrings that mark a user agent as a phone
const MOBILE_HINTS: &[&str] = &["mobile", "android", "iphone"];

/// How a rule tests the user agent
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Contains any of the substrings
    Any(&'static [&'static str]),
    /// Looks like a phone and contains the substring
    MobileWith(&'static str),
}

impl Matcher {
    /// `user_agent` must already be lower-cased
    fn matches(&self, user_agent: &str) -> bool {
        match *self {
            Matcher::Any(needles) => contains_any(user_agent, needles),
            Matcher::MobileWith(needle) => {
                contains_any(user_agent, MOBILE_HINTS) && user_agent.contains(needle)
            }
        }
    }
}

/// One entry of the inference table
#[derive(Debug, Clone, Copy)]
pub struct DeviceRule {
    pub matcher: Matcher,
    pub name: &'static str,
}

impl DeviceRule {
    const fn new(matcher: Matcher, name: &'static str) -> Self {
        Self { matcher, name }
    }
}

/// Rules in priority order
pub const DEVICE_RULES: &[DeviceRule] = &[
    DeviceRule::new(Matcher::Any(&["iphone"]), "iPhone"),
    DeviceRule::new(Matcher::MobileWith("samsung"), "Samsung Phone"),
    DeviceRule::new(Matcher::MobileWith("pixel"), "Google Pixel"),
    DeviceRule::new(Matcher::MobileWith("android"), "Android Phone"),
    DeviceRule::new(Matcher::Any(MOBILE_HINTS), "Mobile Phone"),
    DeviceRule::new(Matcher::Any(&["ipad"]), "iPad"),
    DeviceRule::new(Matcher::Any(&["tablet"]), "Tablet"),
    DeviceRule::new(Matcher::Any(&["mac", "macos"]), "Mac Computer"),
    DeviceRule::new(Matcher::Any(&["windows"]), "Windows Computer"),
    DeviceRule::new(Matcher::Any(&["linux"]), "Linux Computer"),
];

/// Derive a human-readable device name from publisher metadata
pub fn derive_device_name(info: &DeviceInfo) -> String {
    let user_agent = info.user_agent().to_lowercase();

    if let Some(rule) = DEVICE_RULES
        .iter()
        .find(|rule| rule.matcher.matches(&user_agent))
    {
        return rule.name.to_string();
    }

    let platform = info.platform();
    if !platform.is_empty() {
        return capitalize(platform);
    }

    FALLBACK_NAME.to_string()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// First character upper-cased, the rest lower-cased
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
