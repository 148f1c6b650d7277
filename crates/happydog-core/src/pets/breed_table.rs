// Breed-table ideal weights used to seed `PetCareSettings.goal_weight_kg`
// at registration (spec.md §4.9). A small fixed table stands in for the
// original's database-backed breed reference (`original_source`'s
// `breed_reference` table) — large enough to exercise the strict-validation
// path without vendoring the full breed catalog.

use crate::model::Gender;

struct BreedEntry {
    breed: &'static str,
    male_ideal_kg: f64,
    female_ideal_kg: f64,
}

const BREED_TABLE: &[BreedEntry] = &[
    BreedEntry { breed: "Labrador Retriever", male_ideal_kg: 32.0, female_ideal_kg: 27.0 },
    BreedEntry { breed: "Pug", male_ideal_kg: 8.0, female_ideal_kg: 7.0 },
    BreedEntry { breed: "Golden Retriever", male_ideal_kg: 34.0, female_ideal_kg: 29.0 },
    BreedEntry { breed: "Poodle", male_ideal_kg: 25.0, female_ideal_kg: 22.0 },
    BreedEntry { breed: "Chihuahua", male_ideal_kg: 2.7, female_ideal_kg: 2.3 },
    BreedEntry { breed: "Shiba Inu", male_ideal_kg: 10.0, female_ideal_kg: 8.0 },
    BreedEntry { breed: "Border Collie", male_ideal_kg: 18.0, female_ideal_kg: 16.0 },
    BreedEntry { breed: "Beagle", male_ideal_kg: 11.0, female_ideal_kg: 10.0 },
    BreedEntry { breed: "Dachshund", male_ideal_kg: 9.0, female_ideal_kg: 8.0 },
    BreedEntry { breed: "Siberian Husky", male_ideal_kg: 24.0, female_ideal_kg: 20.0 },
];

/// Look up the ideal weight for `(breed, gender)`. `None` if the breed is
/// not in the table — spec.md §4.9 treats this as a hard registration
/// failure (the strict variant), not a fallback.
pub fn ideal_weight_kg(breed: &str, gender: Gender) -> Option<f64> {
    BREED_TABLE.iter().find(|entry| entry.breed.eq_ignore_ascii_case(breed)).map(|entry| match gender {
        Gender::Male => entry.male_ideal_kg,
        Gender::Female => entry.female_ideal_kg,
    })
}
