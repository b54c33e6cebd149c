//! Coordinate name resolution.
//!
//! Gridded datasets name their spatial axes inconsistently. Rather than guessing, names are looked
//! up case-insensitively against ordered alias tables.

/// Latitude aliases accepted when loading, including rotated-pole names
pub const LOADER_LAT_ALIASES: [&str; 4] = ["lat", "latitude", "y", "rlat"];

/// Longitude aliases accepted when loading, including rotated-pole names
pub const LOADER_LON_ALIASES: [&str; 4] = ["lon", "longitude", "x", "rlon"];

/// Latitude aliases accepted when regridding
pub const GEOGRAPHIC_LAT_ALIASES: [&str; 3] = ["lat", "latitude", "y"];

/// Longitude aliases accepted when regridding
pub const GEOGRAPHIC_LON_ALIASES: [&str; 3] = ["lon", "longitude", "x"];

/// Time aliases
pub const TIME_ALIASES: [&str; 2] = ["time", "t"];

/// Rainfall variable aliases
pub const RAINFALL_ALIASES: [&str; 6] =
    ["pr", "precipitation", "precip", "rain", "rainfall", "pcp"];

/// Return the first name in `names` matching any alias, ignoring case.
///
/// Names are scanned in the order given, so the dataset's declaration order decides between
/// several matching names.
pub fn resolve<'a, I>(names: I, aliases: &[&str]) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .find(|name| aliases.iter().any(|alias| name.eq_ignore_ascii_case(alias)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_case_insensitive() {
        let names = ["time", "Latitude", "LON"];
        assert_eq!(
            Some("Latitude"),
            resolve(names.iter().copied(), &LOADER_LAT_ALIASES)
        );
        assert_eq!(
            Some("LON"),
            resolve(names.iter().copied(), &LOADER_LON_ALIASES)
        );
    }

    #[test]
    fn test_resolve_none() {
        let names = ["time", "northing", "easting"];
        assert_eq!(None, resolve(names.iter().copied(), &LOADER_LAT_ALIASES));
    }

    #[test]
    fn test_rotated_pole_only_when_loading() {
        let names = ["rlat", "rlon"];
        assert_eq!(
            Some("rlat"),
            resolve(names.iter().copied(), &LOADER_LAT_ALIASES)
        );
        assert_eq!(
            None,
            resolve(names.iter().copied(), &GEOGRAPHIC_LAT_ALIASES)
        );
    }

    #[test]
    fn test_resolve_declaration_order() {
        let names = ["y", "lat"];
        assert_eq!(
            Some("y"),
            resolve(names.iter().copied(), &GEOGRAPHIC_LAT_ALIASES)
        );
    }

    #[test]
    fn test_rainfall_alias_declaration_order() {
        let names = ["tas", "rainfall", "PR"];
        assert_eq!(
            Some("rainfall"),
            resolve(names.iter().copied(), &RAINFALL_ALIASES)
        );
        let names = ["tas", "tasmax"];
        assert_eq!(None, resolve(names.iter().copied(), &RAINFALL_ALIASES));
    }
}
