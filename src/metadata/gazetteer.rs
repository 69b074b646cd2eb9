//! Static country tables.
//!
//! Illustrative, not exhaustive: a country missing here simply yields no
//! match.

/// Sentinel returned for headquarters / global documents, as both country
/// and region.
pub const HQ: &str = "HQ";

/// Entries that are not countries and never match by name.
pub const META_ENTRIES: &[&str] = &["Global", HQ];

/// Standalone tokens that mark a headquarters document.
pub(crate) const HQ_TOKENS: &[&str] = &["global", "headquarters", "hq"];

/// Variant spelling → canonical country name.
pub(crate) const ALIASES: &[(&str, &str)] = &[
    ("viet nam", "Viet Nam"),
    ("vietnam", "Viet Nam"),
    ("cote d'ivoire", "Côte d'Ivoire"),
    ("ivory coast", "Côte d'Ivoire"),
    ("drc", "Democratic Republic of the Congo"),
    ("dr congo", "Democratic Republic of the Congo"),
    ("democratic republic of congo", "Democratic Republic of the Congo"),
    ("lao pdr", "Lao People's Democratic Republic"),
    ("laos", "Lao People's Democratic Republic"),
    ("syria", "Syrian Arab Republic"),
    ("turkey", "Türkiye"),
    ("turkiye", "Türkiye"),
    ("tanzania", "United Republic of Tanzania"),
    ("bolivia", "Bolivia (Plurinational State of)"),
    ("palestine", "State of Palestine"),
    ("kyrgyz republic", "Kyrgyzstan"),
    ("burma", "Myanmar"),
];

/// Canonical country name → regional office code.
pub(crate) const COUNTRY_REGIONS: &[(&str, &str)] = &[
    // Eastern and Southern Africa
    ("Ethiopia", "ESARO"),
    ("Kenya", "ESARO"),
    ("Rwanda", "ESARO"),
    ("South Sudan", "ESARO"),
    ("Uganda", "ESARO"),
    ("United Republic of Tanzania", "ESARO"),
    ("Zambia", "ESARO"),
    // West and Central Africa
    ("Côte d'Ivoire", "WCARO"),
    ("Congo", "WCARO"),
    ("Democratic Republic of the Congo", "WCARO"),
    ("Equatorial Guinea", "WCARO"),
    ("Ghana", "WCARO"),
    ("Guinea", "WCARO"),
    ("Guinea-Bissau", "WCARO"),
    ("Mali", "WCARO"),
    ("Niger", "WCARO"),
    ("Nigeria", "WCARO"),
    // Middle East and North Africa
    ("Egypt", "MENARO"),
    ("Jordan", "MENARO"),
    ("State of Palestine", "MENARO"),
    ("Sudan", "MENARO"),
    ("Syrian Arab Republic", "MENARO"),
    ("Yemen", "MENARO"),
    // East Asia and the Pacific
    ("Cambodia", "EAPRO"),
    ("Indonesia", "EAPRO"),
    ("Lao People's Democratic Republic", "EAPRO"),
    ("Myanmar", "EAPRO"),
    ("Papua New Guinea", "EAPRO"),
    ("Philippines", "EAPRO"),
    ("Viet Nam", "EAPRO"),
    // South Asia
    ("Afghanistan", "ROSA"),
    ("Bangladesh", "ROSA"),
    ("India", "ROSA"),
    ("Nepal", "ROSA"),
    ("Pakistan", "ROSA"),
    ("Sri Lanka", "ROSA"),
    // Latin America and the Caribbean
    ("Bolivia (Plurinational State of)", "LACRO"),
    ("Brazil", "LACRO"),
    ("Colombia", "LACRO"),
    ("Guatemala", "LACRO"),
    ("Haiti", "LACRO"),
    // Europe and Central Asia
    ("Kyrgyzstan", "ECARO"),
    ("Tajikistan", "ECARO"),
    ("Türkiye", "ECARO"),
    ("Ukraine", "ECARO"),
];

/// Whether `name` is a canonical country in [`COUNTRY_REGIONS`].
pub(crate) fn is_known_country(name: &str) -> bool {
    COUNTRY_REGIONS.iter().any(|(country, _)| *country == name)
}
