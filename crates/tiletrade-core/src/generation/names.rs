//! Name generation utilities

use crate::components::Name;
use rand::Rng;

/// Generate a random townsperson name
pub fn generate_name(rng: &mut impl Rng) -> Name {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())];

    Name::new(given, family)
}

static GIVEN_NAMES: &[&str] = &[
    "Ada", "Bram", "Cora", "Dell", "Edie", "Finn", "Greta", "Hal", "Ines", "Jory", "Kit",
    "Lena", "Milo", "Nell", "Otto", "Pia", "Quill", "Rosa", "Silas", "Tova", "Ulla", "Vance",
    "Wren", "Yara", "Zeke", "Moss", "Juniper", "Hazel", "Rowan", "Alder",
];

// Trade surnames, mostly
static FAMILY_NAMES: &[&str] = &[
    "Fisher", "Baker", "Cooper", "Miller", "Carter", "Thatcher", "Mason", "Tanner", "Weaver",
    "Fletcher", "Chandler", "Brewer", "Porter", "Sawyer", "Shepherd", "Gardner", "Hooper",
    "Salter", "Netter", "Orchard", "Pike", "Marsh", "Brook", "Reed", "Hale",
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_name() {
        let mut rng = StdRng::seed_from_u64(1);
        let name = generate_name(&mut rng);

        assert!(!name.given.is_empty());
        assert!(!name.family.is_empty());
    }

    #[test]
    fn test_name_variety() {
        let mut rng = StdRng::seed_from_u64(2);
        let names: Vec<Name> = (0..100).map(|_| generate_name(&mut rng)).collect();

        let unique_given: std::collections::HashSet<_> = names.iter().map(|n| &n.given).collect();
        let unique_family: std::collections::HashSet<_> = names.iter().map(|n| &n.family).collect();

        assert!(unique_given.len() > 10);
        assert!(unique_family.len() > 10);
    }

    #[test]
    fn test_seeded_names_repeat() {
        let a = generate_name(&mut StdRng::seed_from_u64(9));
        let b = generate_name(&mut StdRng::seed_from_u64(9));
        assert_eq!(a.full_name(), b.full_name());
    }
}
