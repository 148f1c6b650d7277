// ── Pet & Care Profile (C9) ─────────────────────────────────────────────
// `register_pet` is the only compound write here: Pet + PetCareSettings in
// one transaction, seeded deterministically from the registration inputs
// (spec.md §4.9). This core follows the strict breed-validation variant
// spec.md §9 decides: an unknown breed fails the whole transaction rather
// than silently falling back to `initial_weight_kg`.

mod breed_table;
mod care;

pub use care::{CareRecordService, CareSummary};

use crate::clock;
use crate::docstore::DocStore;
use crate::error::{CoreError, CoreResult};
use crate::model::{Gender, Pet, PetCareSettings};
use std::sync::Arc;

pub struct PetService {
    store: Arc<DocStore>,
    transaction_max_retries: u32,
    transaction_backoff_base_ms: u64,
    transaction_backoff_cap_ms: u64,
}

impl PetService {
    pub fn new(store: Arc<DocStore>, config: &crate::config::Config) -> Self {
        PetService {
            store,
            transaction_max_retries: config.transaction_max_retries,
            transaction_backoff_base_ms: config.transaction_backoff_base_ms,
            transaction_backoff_cap_ms: config.transaction_backoff_cap_ms,
        }
    }

    /// Register a pet and seed its care settings in one transaction. Fails
    /// entirely (no Pet, no PetCareSettings) if `breed` is not in the breed
    /// table.
    pub fn register_pet(
        &self,
        owner_user_id: &str,
        name: &str,
        gender: Gender,
        breed: &str,
        birthdate: crate::clock::Date,
        initial_weight_kg: f64,
        fur_color: Option<String>,
        health_concerns: Vec<String>,
    ) -> CoreResult<(Pet, PetCareSettings)> {
        if name.is_empty() {
            return Err(CoreError::validation("pet name must not be empty"));
        }
        if initial_weight_kg <= 0.0 {
            return Err(CoreError::validation("initial_weight_kg must be positive"));
        }
        let goal_weight_kg = breed_table::ideal_weight_kg(breed, gender)
            .ok_or_else(|| CoreError::validation(format!("unknown breed: {breed}")))?;

        let pet_id = clock::new_uuid();
        let water_bowl_capacity_ml = (initial_weight_kg * 60.0).round() as i64;
        let water_increment_ml = ((water_bowl_capacity_ml as f64) * 0.2).round().max(1.0) as i64;

        let pet = Pet {
            pet_id: pet_id.clone(),
            owner_user_id: owner_user_id.to_string(),
            name: name.to_string(),
            gender,
            breed: breed.to_string(),
            birthdate,
            initial_weight_kg,
            is_verified: false,
            nose_print_url: None,
            vector_index_id: None,
            fur_color,
            health_concerns,
        };
        let settings = PetCareSettings {
            pet_id: pet_id.clone(),
            goal_weight_kg,
            water_bowl_capacity_ml,
            water_increment_ml,
            goal_activity_minutes: 30,
            activity_increment_minutes: 10,
            goal_meal_count: 3,
            meal_increment_count: 1,
        };

        self.store.transaction(
            self.transaction_max_retries,
            self.transaction_backoff_base_ms,
            self.transaction_backoff_cap_ms,
            |tx| {
                tx.set("pets", &pet.pet_id, &clock::now().to_rfc3339(), &pet)?;
                tx.set("pet_care_settings", &settings.pet_id, &settings.pet_id, &settings)?;
                Ok(())
            },
        )?;

        Ok((pet, settings))
    }

    pub fn get_pet(&self, pet_id: &str) -> CoreResult<Option<Pet>> {
        self.store.get("pets", pet_id)
    }

    pub fn get_care_settings(&self, pet_id: &str) -> CoreResult<Option<PetCareSettings>> {
        self.store.get("pet_care_settings", pet_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PetService {
        let store = Arc::new(DocStore::open_in_memory().unwrap());
        PetService::new(store, &crate::config::Config::default())
    }

    #[test]
    fn register_pet_seeds_care_settings_from_breed_table() {
        let service = service();
        let birthdate = crate::clock::today();
        let (pet, settings) = service
            .register_pet("user_1", "Rex", Gender::Male, "Pug", birthdate, 9.0, None, vec![])
            .unwrap();
        assert_eq!(settings.pet_id, pet.pet_id);
        assert_eq!(settings.goal_weight_kg, 8.0);
        assert_eq!(settings.water_bowl_capacity_ml, 540);
        assert_eq!(settings.water_increment_ml, 108);
        assert_eq!(settings.goal_activity_minutes, 30);
    }

    #[test]
    fn register_pet_rejects_unknown_breed_and_writes_nothing() {
        let service = service();
        let birthdate = crate::clock::today();
        let err = service
            .register_pet("user_1", "Rex", Gender::Male, "Moon Dog", birthdate, 9.0, None, vec![])
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn get_pet_round_trips_registration() {
        let service = service();
        let birthdate = crate::clock::today();
        let (pet, _settings) = service
            .register_pet("user_1", "Daisy", Gender::Female, "Beagle", birthdate, 10.0, Some("brown".into()), vec![])
            .unwrap();
        let fetched = service.get_pet(&pet.pet_id).unwrap().unwrap();
        assert_eq!(fetched.name, "Daisy");
        let settings = service.get_care_settings(&pet.pet_id).unwrap().unwrap();
        assert_eq!(settings.goal_weight_kg, 10.0);
    }
}
