// [SUPPLEMENT] CareRecordService — CareRecord is named in spec.md's data
// model (§3) but given no operation set there. Grounded in
// `original_source/.../pet_care/services_new/daily_logs.py` (and
// `individual_logs.py`, `analytics.py`): one daily-log document per
// `(pet_id, date)` holding an array of individual records, keyed by C1's
// `compose_daily_log_id`. `analytics.py`'s ML-driven `recommendations.py`
// is NOT carried over — out of scope, same as spec.md's stated non-goals.

use crate::clock::{self, Date, Instant};
use crate::docstore::DocStore;
use crate::error::{CoreError, CoreResult};
use crate::model::{CareRecord, Pet, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCareLog {
    log_id: String,
    pet_id: String,
    date: Date,
    records: Vec<CareRecord>,
}

pub struct CareSummary {
    pub from_date: Date,
    pub to_date: Date,
    pub totals: HashMap<RecordType, f64>,
    pub averages: HashMap<RecordType, f64>,
    pub record_counts: HashMap<RecordType, usize>,
}

pub struct CareRecordService {
    store: Arc<DocStore>,
    transaction_max_retries: u32,
    transaction_backoff_base_ms: u64,
    transaction_backoff_cap_ms: u64,
}

impl CareRecordService {
    pub fn new(store: Arc<DocStore>, config: &crate::config::Config) -> Self {
        CareRecordService {
            store,
            transaction_max_retries: config.transaction_max_retries,
            transaction_backoff_base_ms: config.transaction_backoff_base_ms,
            transaction_backoff_cap_ms: config.transaction_backoff_cap_ms,
        }
    }

    fn authorize(&self, pet_id: &str, caller: &str) -> CoreResult<Pet> {
        let pet: Pet = self
            .store
            .get("pets", pet_id)?
            .ok_or_else(|| CoreError::not_found(format!("pet {pet_id} not found")))?;
        if pet.owner_user_id != caller {
            return Err(CoreError::forbidden("caller does not own this pet"));
        }
        Ok(pet)
    }

    /// Append one CareRecord to the daily-log document for
    /// `search_date_for(event_time)`, creating the document if needed.
    pub fn log(
        &self,
        pet_id: &str,
        caller: &str,
        record_type: RecordType,
        event_time: Instant,
        data: f64,
        notes: Option<String>,
    ) -> CoreResult<CareRecord> {
        self.authorize(pet_id, caller)?;
        let search_date = clock::search_date_for(event_time);
        let doc_id = clock::compose_daily_log_id(pet_id, search_date);

        let record = CareRecord {
            log_id: clock::new_uuid(),
            pet_id: pet_id.to_string(),
            record_type,
            event_time,
            search_date,
            data,
            notes,
        };

        self.store.transaction(
            self.transaction_max_retries,
            self.transaction_backoff_base_ms,
            self.transaction_backoff_cap_ms,
            |tx| {
                let mut log: DailyCareLog = tx.get("care_logs", &doc_id)?.unwrap_or_else(|| DailyCareLog {
                    log_id: doc_id.clone(),
                    pet_id: pet_id.to_string(),
                    date: search_date,
                    records: Vec::new(),
                });
                log.records.push(record.clone());
                tx.set("care_logs", &doc_id, &doc_id, &log)?;
                Ok(())
            },
        )?;

        Ok(record)
    }

    pub fn list_for_date(&self, pet_id: &str, caller: &str, date: Date) -> CoreResult<Vec<CareRecord>> {
        self.authorize(pet_id, caller)?;
        let doc_id = clock::compose_daily_log_id(pet_id, date);
        let log: Option<DailyCareLog> = self.store.get("care_logs", &doc_id)?;
        Ok(log.map(|l| l.records).unwrap_or_default())
    }

    /// Per-type totals/averages over `[from_date, to_date]` inclusive.
    /// Read-only, no transaction needed.
    pub fn summary(&self, pet_id: &str, caller: &str, from_date: Date, to_date: Date) -> CoreResult<CareSummary> {
        self.authorize(pet_id, caller)?;

        let mut totals: HashMap<RecordType, f64> = HashMap::new();
        let mut record_counts: HashMap<RecordType, usize> = HashMap::new();

        let mut day = from_date;
        while day <= to_date {
            let doc_id = clock::compose_daily_log_id(pet_id, day);
            if let Some(log) = self.store.get::<DailyCareLog>("care_logs", &doc_id)? {
                for record in log.records {
                    *totals.entry(record.record_type).or_insert(0.0) += record.data;
                    *record_counts.entry(record.record_type).or_insert(0) += 1;
                }
            }
            let Some(next) = day.succ_opt() else { break };
            day = next;
        }

        let averages = totals
            .iter()
            .map(|(record_type, total)| {
                let count = *record_counts.get(record_type).unwrap_or(&1) as f64;
                (*record_type, total / count.max(1.0))
            })
            .collect();

        Ok(CareSummary { from_date, to_date, totals, averages, record_counts })
    }
}
