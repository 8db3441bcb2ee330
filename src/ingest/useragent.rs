//! Minimal User-Agent parser for device class and OS detection.
use serde::{Deserialize, Serialize};

/// Tri-state device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    /// Also the answer for absent or unrecognised user agents.
    #[default]
    Desktop,
}

impl DeviceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed User-Agent information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUserAgent {
    pub device_type: DeviceType,
    pub os: Option<String>,
}

/// Parse a User-Agent string into device class and OS name.
pub fn parse_user_agent(ua: &str) -> ParsedUserAgent {
    ParsedUserAgent {
        device_type: detect_device(ua),
        os: detect_os(ua),
    }
}

fn detect_device(ua: &str) -> DeviceType {
    // Tablets first: iPad and Android tablets would otherwise match the mobile rules
    if ua.contains("iPad")
        || ua.contains("Tablet")
        || ua.contains("Kindle")
        || ua.contains("Silk/")
        || (ua.contains("Android") && !ua.contains("Mobile"))
    {
        DeviceType::Tablet
    } else if ua.contains("Mobi")
        || ua.contains("iPhone")
        || ua.contains("iPod")
        || ua.contains("Windows Phone")
        || ua.contains("BlackBerry")
    {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    }
}

fn detect_os(ua: &str) -> Option<String> {
    let os = if ua.contains("Windows Phone") {
        "Windows Phone"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        // Check iOS before macOS since iPhone UAs contain "Mac OS X"
        "iOS"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Android") {
        // Android UAs also contain "Linux"
        "Android"
    } else if ua.contains("CrOS") {
        "Chrome OS"
    } else if ua.contains("Linux") || ua.contains("X11") {
        "Linux"
    } else {
        return None;
    };
    Some(os.to_string())
}
