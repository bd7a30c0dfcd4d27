//! Human-readable labels for the coded columns

/// Experience level code -> label
pub fn experience_level_label(code: &str) -> Option<&'static str> {
    match code {
        "EN" => Some("Entry Level"),
        "MI" => Some("Mid Level"),
        "SE" => Some("Senior Level"),
        "EX" => Some("Executive Level"),
        _ => None,
    }
}

/// Employment type code -> label
pub fn employment_type_label(code: &str) -> Option<&'static str> {
    match code {
        "FT" => Some("Full Time"),
        "PT" => Some("Part Time"),
        "CT" => Some("Contract"),
        "FL" => Some("Freelance"),
        _ => None,
    }
}

/// Company size code -> label
pub fn company_size_label(code: &str) -> Option<&'static str> {
    match code {
        "S" => Some("Small"),
        "M" => Some("Medium"),
        "L" => Some("Large"),
        _ => None,
    }
}

/// Remote ratio -> work arrangement
pub fn remote_ratio_label(ratio: u8) -> Option<&'static str> {
    match ratio {
        0 => Some("On-site"),
        50 => Some("Hybrid"),
        100 => Some("Remote"),
        _ => None,
    }
}

const COUNTRY_NAMES: [(&str, &str); 50] = [
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CO", "Colombia"),
    ("CZ", "Czech Republic"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EE", "Estonia"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HK", "Hong Kong"),
    ("HR", "Croatia"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PH", "Philippines"),
    ("PK", "Pakistan"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RU", "Russia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("VN", "Vietnam"),
];

/// Country code -> name, for codes with a known name
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRY_NAMES
        .binary_search_by(|(c, _)| (*c).cmp(code))
        .ok()
        .map(|idx| COUNTRY_NAMES[idx].1)
}

/// Display name for a country code, falling back to the code itself.
///
/// Display only: prediction vocabulary is always the raw code.
pub fn country_display(code: &str) -> String {
    country_name(code)
        .map(str::to_string)
        .unwrap_or_else(|| code.to_string())
}
