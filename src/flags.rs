//! Country name to flag emoji lookup

/// Flag shown when a location is not a known country
pub const UNKNOWN_FLAG: &str = "🌍";

const COUNTRY_FLAGS: &[(&str, &str)] = &[
    ("Afghanistan", "🇦🇫"),
    ("Albania", "🇦🇱"),
    ("Algeria", "🇩🇿"),
    ("Argentina", "🇦🇷"),
    ("Australia", "🇦🇺"),
    ("Austria", "🇦🇹"),
    ("Bangladesh", "🇧🇩"),
    ("Belgium", "🇧🇪"),
    ("Brazil", "🇧🇷"),
    ("Canada", "🇨🇦"),
    ("Chile", "🇨🇱"),
    ("China", "🇨🇳"),
    ("Colombia", "🇨🇴"),
    ("Czech Republic", "🇨🇿"),
    ("Denmark", "🇩🇰"),
    ("Egypt", "🇪🇬"),
    ("Europe", "🇪🇺"),
    ("Finland", "🇫🇮"),
    ("France", "🇫🇷"),
    ("Germany", "🇩🇪"),
    ("Greece", "🇬🇷"),
    ("Hong Kong", "🇭🇰"),
    ("Hungary", "🇭🇺"),
    ("India", "🇮🇳"),
    ("Indonesia", "🇮🇩"),
    ("Iran", "🇮🇷"),
    ("Iraq", "🇮🇶"),
    ("Ireland", "🇮🇪"),
    ("Israel", "🇮🇱"),
    ("Italy", "🇮🇹"),
    ("Japan", "🇯🇵"),
    ("Kenya", "🇰🇪"),
    ("Korea", "🇰🇷"),
    ("Malaysia", "🇲🇾"),
    ("Mexico", "🇲🇽"),
    ("Netherlands", "🇳🇱"),
    ("New Zealand", "🇳🇿"),
    ("Nigeria", "🇳🇬"),
    ("Norway", "🇳🇴"),
    ("Pakistan", "🇵🇰"),
    ("Peru", "🇵🇪"),
    ("Philippines", "🇵🇭"),
    ("Poland", "🇵🇱"),
    ("Portugal", "🇵🇹"),
    ("Romania", "🇷🇴"),
    ("Russia", "🇷🇺"),
    ("Saudi Arabia", "🇸🇦"),
    ("Singapore", "🇸🇬"),
    ("South Africa", "🇿🇦"),
    ("South Korea", "🇰🇷"),
    ("Spain", "🇪🇸"),
    ("Sweden", "🇸🇪"),
    ("Switzerland", "🇨🇭"),
    ("Taiwan", "🇹🇼"),
    ("Thailand", "🇹🇭"),
    ("Turkey", "🇹🇷"),
    ("Ukraine", "🇺🇦"),
    ("United Arab Emirates", "🇦🇪"),
    ("United Kingdom", "🇬🇧"),
    ("United States", "🇺🇸"),
    ("Venezuela", "🇻🇪"),
    ("Vietnam", "🇻🇳"),
];

/// Returns the flag for a country name, or the globe for anything unknown
///
/// Exact names match first; otherwise the trimmed name is compared ignoring case.
pub fn flag_for(location: &str) -> &'static str {
    if let Some((_, flag)) = COUNTRY_FLAGS.iter().find(|(name, _)| *name == location) {
        return *flag;
    }

    let normalized = location.trim();
    COUNTRY_FLAGS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(normalized))
        .map(|(_, flag)| *flag)
        .unwrap_or(UNKNOWN_FLAG)
}

/// Tooltip label for a location
pub fn label_for(location: &str) -> String {
    format!("{} {}", flag_for(location), location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(flag_for("Canada"), "🇨🇦");
        assert_eq!(flag_for("United Kingdom"), "🇬🇧");
    }

    #[test]
    fn test_case_insensitive_trimmed_match() {
        assert_eq!(flag_for("  japan "), "🇯🇵");
        assert_eq!(flag_for("SOUTH KOREA"), "🇰🇷");
    }

    #[test]
    fn test_unknown_location_gets_globe() {
        assert_eq!(flag_for("Atlantis"), UNKNOWN_FLAG);
        assert_eq!(flag_for(""), UNKNOWN_FLAG);
    }

    #[test]
    fn test_label() {
        assert_eq!(label_for("France"), "🇫🇷 France");
    }
}
