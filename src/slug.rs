/// URL slug from a display name: lowercased, runs of anything outside
/// `[a-z0-9]` collapsed to a single hyphen, leading/trailing hyphens trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Kitchen Appliances"), "kitchen-appliances");
    }

    #[test]
    fn collapses_symbol_runs() {
        assert_eq!(slugify("Samsung 55\" Smart TV"), "samsung-55-smart-tv");
        assert_eq!(slugify("Fridge -- Double Door"), "fridge-double-door");
    }

    #[test]
    fn trims_edge_hyphens() {
        assert_eq!(slugify("  Ramtons Kettle!  "), "ramtons-kettle");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(slugify("LG 253L Fridge"), "lg-253l-fridge");
    }
}
