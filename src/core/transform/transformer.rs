//! Study flattening into per-table row buffers
//!
//! One [`Transformer`] instance accumulates rows for all seven warehouse
//! tables until the orchestrator drains it with [`Transformer::take_batches`].
//! Transformation itself is stateless between studies; the buffers are the
//! only state and they belong to the current batch.

use crate::core::transform::dates::{parse_partial_date, parse_partial_timestamp};
use crate::domain::rows::{
    ConditionRow, DesignOutcomeRow, InterventionArmGroupRow, InterventionRow, RawStudyRow,
    SponsorRow, StudyRow, TableBatch,
};
use crate::domain::study::{Outcome, Study};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;

/// Accumulates normalized rows for one load batch
#[derive(Debug, Default)]
pub struct Transformer {
    raw_studies: Vec<RawStudyRow>,
    studies: Vec<StudyRow>,
    sponsors: Vec<SponsorRow>,
    conditions: Vec<ConditionRow>,
    interventions: Vec<InterventionRow>,
    intervention_arm_groups: Vec<InterventionArmGroupRow>,
    design_outcomes: Vec<DesignOutcomeRow>,
    /// NCT IDs already buffered in this batch. A re-appearing study replaces
    /// its earlier rows so a single merge statement never sees the same
    /// natural key twice (last write wins).
    seen_nct_ids: HashSet<String>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten one validated study (plus its untouched raw payload) into the
    /// batch buffers.
    pub fn transform_study(&mut self, study: &Study, raw_payload: &Value) {
        let nct_id = study.nct_id().to_string();

        if !self.seen_nct_ids.insert(nct_id.clone()) {
            tracing::debug!(nct_id = %nct_id, "Duplicate NCT ID within batch, replacing earlier rows");
            self.remove_study_rows(&nct_id);
        }

        self.push_raw_study(&nct_id, study, raw_payload);
        self.push_study(&nct_id, study);
        self.push_sponsors(&nct_id, study);
        self.push_conditions(&nct_id, study);
        self.push_interventions(&nct_id, study);
        self.push_intervention_arm_groups(&nct_id, study);
        self.push_outcomes(&nct_id, study);
    }

    /// Size of the largest buffer, used for flush decisions
    pub fn max_buffer_len(&self) -> usize {
        [
            self.raw_studies.len(),
            self.studies.len(),
            self.sponsors.len(),
            self.conditions.len(),
            self.interventions.len(),
            self.intervention_arm_groups.len(),
            self.design_outcomes.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Number of studies buffered in the current batch
    pub fn studies_buffered(&self) -> usize {
        self.studies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.is_empty() && self.raw_studies.is_empty()
    }

    /// Drain the buffers into non-empty batches, in merge dependency order
    /// (`raw_studies` first, then `studies`, then children), and reset.
    pub fn take_batches(&mut self) -> Vec<TableBatch> {
        let batches = vec![
            TableBatch::RawStudies(std::mem::take(&mut self.raw_studies)),
            TableBatch::Studies(std::mem::take(&mut self.studies)),
            TableBatch::Sponsors(std::mem::take(&mut self.sponsors)),
            TableBatch::Conditions(std::mem::take(&mut self.conditions)),
            TableBatch::Interventions(std::mem::take(&mut self.interventions)),
            TableBatch::InterventionArmGroups(std::mem::take(&mut self.intervention_arm_groups)),
            TableBatch::DesignOutcomes(std::mem::take(&mut self.design_outcomes)),
        ];
        self.seen_nct_ids.clear();

        batches.into_iter().filter(|b| !b.is_empty()).collect()
    }

    fn remove_study_rows(&mut self, nct_id: &str) {
        self.raw_studies.retain(|r| r.nct_id != nct_id);
        self.studies.retain(|r| r.nct_id != nct_id);
        self.sponsors.retain(|r| r.nct_id != nct_id);
        self.conditions.retain(|r| r.nct_id != nct_id);
        self.interventions.retain(|r| r.nct_id != nct_id);
        self.intervention_arm_groups.retain(|r| r.nct_id != nct_id);
        self.design_outcomes.retain(|r| r.nct_id != nct_id);
    }

    fn push_raw_study(&mut self, nct_id: &str, study: &Study, raw_payload: &Value) {
        let last_updated_str = study
            .protocol_section
            .status_module
            .last_update_post_date_struct
            .as_ref()
            .and_then(|s| s.date.clone());

        self.raw_studies.push(RawStudyRow {
            nct_id: nct_id.to_string(),
            last_updated_api: last_updated_str
                .as_deref()
                .and_then(parse_partial_timestamp),
            last_updated_api_str: last_updated_str,
            ingestion_timestamp: Utc::now(),
            payload: raw_payload.clone(),
        });
    }

    fn push_study(&mut self, nct_id: &str, study: &Study) {
        let id_module = &study.protocol_section.identification_module;
        let status_module = &study.protocol_section.status_module;

        let start_date_str = status_module
            .start_date_struct
            .as_ref()
            .and_then(|s| s.date.clone());
        let completion_date_str = status_module
            .primary_completion_date_struct
            .as_ref()
            .and_then(|s| s.date.clone());

        self.studies.push(StudyRow {
            nct_id: nct_id.to_string(),
            brief_title: id_module.brief_title.clone(),
            official_title: id_module.official_title.clone(),
            overall_status: status_module.overall_status.clone(),
            start_date: start_date_str.as_deref().and_then(parse_partial_date),
            start_date_str,
            primary_completion_date: completion_date_str
                .as_deref()
                .and_then(parse_partial_date),
            primary_completion_date_str: completion_date_str,
            study_type: study
                .protocol_section
                .design_module
                .as_ref()
                .and_then(|m| m.study_type.clone()),
            brief_summary: study
                .protocol_section
                .description_module
                .as_ref()
                .and_then(|m| m.brief_summary.clone()),
        });
    }

    fn push_sponsors(&mut self, nct_id: &str, study: &Study) {
        let Some(module) = &study.protocol_section.sponsor_collaborators_module else {
            return;
        };

        // Natural key is (nct_id, name, agency_class); first occurrence wins
        // within one study, so the lead sponsor shadows a duplicate
        // collaborator entry.
        let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();

        if let Some(lead) = &module.lead_sponsor {
            seen.insert((lead.name.clone(), lead.agency_class.clone()));
            self.sponsors.push(SponsorRow {
                nct_id: nct_id.to_string(),
                agency_class: lead.agency_class.clone(),
                name: lead.name.clone(),
                is_lead: true,
            });
        }

        if let Some(collaborators) = &module.collaborators {
            for collaborator in collaborators {
                let key = (collaborator.name.clone(), collaborator.agency_class.clone());
                if !seen.insert(key) {
                    continue;
                }
                self.sponsors.push(SponsorRow {
                    nct_id: nct_id.to_string(),
                    agency_class: collaborator.agency_class.clone(),
                    name: collaborator.name.clone(),
                    is_lead: false,
                });
            }
        }
    }

    fn push_conditions(&mut self, nct_id: &str, study: &Study) {
        let Some(conditions) = study
            .protocol_section
            .conditions_module
            .as_ref()
            .and_then(|m| m.conditions.as_ref())
        else {
            return;
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for condition in conditions {
            if !seen.insert(condition.as_str()) {
                continue;
            }
            self.conditions.push(ConditionRow {
                nct_id: nct_id.to_string(),
                name: condition.clone(),
            });
        }
    }

    fn push_interventions(&mut self, nct_id: &str, study: &Study) {
        let Some(interventions) = study
            .protocol_section
            .arms_interventions_module
            .as_ref()
            .and_then(|m| m.interventions.as_ref())
        else {
            return;
        };

        let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
        for intervention in interventions {
            let key = (
                intervention.intervention_type.clone(),
                intervention.name.clone(),
            );
            if !seen.insert(key) {
                continue;
            }
            self.interventions.push(InterventionRow {
                nct_id: nct_id.to_string(),
                intervention_type: intervention.intervention_type.clone(),
                name: intervention.name.clone(),
                description: intervention.description.clone(),
            });
        }
    }

    fn push_intervention_arm_groups(&mut self, nct_id: &str, study: &Study) {
        let Some(interventions) = study
            .protocol_section
            .arms_interventions_module
            .as_ref()
            .and_then(|m| m.interventions.as_ref())
        else {
            return;
        };

        let mut seen: HashSet<(Option<String>, String)> = HashSet::new();
        for intervention in interventions {
            let Some(labels) = &intervention.arm_group_labels else {
                continue;
            };
            for label in labels {
                let key = (intervention.name.clone(), label.clone());
                if !seen.insert(key) {
                    continue;
                }
                self.intervention_arm_groups.push(InterventionArmGroupRow {
                    nct_id: nct_id.to_string(),
                    intervention_name: intervention.name.clone(),
                    arm_group_label: label.clone(),
                });
            }
        }
    }

    fn push_outcomes(&mut self, nct_id: &str, study: &Study) {
        let Some(module) = &study.protocol_section.outcomes_module else {
            return;
        };

        let mut seen: HashSet<(&'static str, Option<String>)> = HashSet::new();
        let mut push = |buffer: &mut Vec<DesignOutcomeRow>,
                        outcome_type: &'static str,
                        outcome: &Outcome| {
            let key = (outcome_type, outcome.measure.clone());
            if !seen.insert(key) {
                return;
            }
            buffer.push(DesignOutcomeRow {
                nct_id: nct_id.to_string(),
                outcome_type: outcome_type.to_string(),
                measure: outcome.measure.clone(),
                time_frame: outcome.time_frame.clone(),
                description: outcome.description.clone(),
            });
        };

        if let Some(outcomes) = &module.primary_outcomes {
            for outcome in outcomes {
                push(&mut self.design_outcomes, "PRIMARY", outcome);
            }
        }

        if let Some(outcomes) = &module.secondary_outcomes {
            for outcome in outcomes {
                push(&mut self.design_outcomes, "SECONDARY", outcome);
            }
        }

        // Other outcome categories are not part of the warehouse model.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validate::validate_study;
    use serde_json::json;

    fn full_study_payload() -> Value {
        json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT01234567",
                    "briefTitle": "A Study of Something",
                    "officialTitle": "An Official Study of Something"
                },
                "statusModule": {
                    "overallStatus": "COMPLETED",
                    "startDateStruct": { "date": "2023-05", "type": "ACTUAL" },
                    "primaryCompletionDateStruct": { "date": "2024-06-30", "type": "ACTUAL" },
                    "lastUpdatePostDateStruct": { "date": "2024-07-01", "type": "ACTUAL" }
                },
                "sponsorCollaboratorsModule": {
                    "leadSponsor": { "name": "Acme Pharma", "class": "INDUSTRY" },
                    "collaborators": [
                        { "name": "University Hospital", "class": "OTHER" }
                    ]
                },
                "descriptionModule": { "briefSummary": "We studied something." },
                "conditionsModule": { "conditions": ["Hypertension", "Diabetes"] },
                "designModule": { "studyType": "INTERVENTIONAL" },
                "armsInterventionsModule": {
                    "interventions": [{
                        "type": "DRUG",
                        "name": "Aspirin",
                        "description": "Low dose",
                        "armGroupLabels": ["Arm A", "Arm B"]
                    }]
                },
                "outcomesModule": {
                    "primaryOutcomes": [
                        { "measure": "Blood pressure", "timeFrame": "12 weeks" }
                    ],
                    "secondaryOutcomes": [
                        { "measure": "Heart rate", "timeFrame": "12 weeks" }
                    ],
                    "otherOutcomes": [
                        { "measure": "Quality of life", "timeFrame": "24 weeks" }
                    ]
                }
            }
        })
    }

    fn transform(payload: &Value) -> Transformer {
        let study = validate_study(payload).unwrap();
        let mut transformer = Transformer::new();
        transformer.transform_study(&study, payload);
        transformer
    }

    #[test]
    fn test_full_study_fans_out_to_all_tables() {
        let transformer = transform(&full_study_payload());

        assert_eq!(transformer.raw_studies.len(), 1);
        assert_eq!(transformer.studies.len(), 1);
        assert_eq!(transformer.sponsors.len(), 2);
        assert_eq!(transformer.conditions.len(), 2);
        assert_eq!(transformer.interventions.len(), 1);
        assert_eq!(transformer.intervention_arm_groups.len(), 2);
        // PRIMARY + SECONDARY only; the other outcome is skipped
        assert_eq!(transformer.design_outcomes.len(), 2);
        assert_eq!(transformer.studies_buffered(), 1);
    }

    #[test]
    fn test_study_row_preserves_partial_dates() {
        let transformer = transform(&full_study_payload());
        let row = &transformer.studies[0];

        assert_eq!(row.start_date_str.as_deref(), Some("2023-05"));
        assert_eq!(
            row.start_date,
            chrono::NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            row.primary_completion_date,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 30)
        );
    }

    #[test]
    fn test_unparseable_date_keeps_string_only() {
        let mut payload = full_study_payload();
        payload["protocolSection"]["statusModule"]["startDateStruct"]["date"] = json!("2024");

        let transformer = transform(&payload);
        let row = &transformer.studies[0];
        assert_eq!(row.start_date_str.as_deref(), Some("2024"));
        assert_eq!(row.start_date, chrono::NaiveDate::from_ymd_opt(2024, 1, 1));

        let mut payload = full_study_payload();
        payload["protocolSection"]["statusModule"]["startDateStruct"]["date"] = json!("unknown");
        let transformer = transform(&payload);
        let row = &transformer.studies[0];
        assert_eq!(row.start_date_str.as_deref(), Some("unknown"));
        assert!(row.start_date.is_none());
    }

    #[test]
    fn test_lead_sponsor_flag() {
        let transformer = transform(&full_study_payload());
        let lead = transformer.sponsors.iter().find(|s| s.is_lead).unwrap();
        assert_eq!(lead.name.as_deref(), Some("Acme Pharma"));
        let collab = transformer.sponsors.iter().find(|s| !s.is_lead).unwrap();
        assert_eq!(collab.name.as_deref(), Some("University Hospital"));
    }

    #[test]
    fn test_raw_study_carries_watermark_and_payload() {
        let payload = full_study_payload();
        let transformer = transform(&payload);
        let row = &transformer.raw_studies[0];

        assert_eq!(row.last_updated_api_str.as_deref(), Some("2024-07-01"));
        assert!(row.last_updated_api.is_some());
        assert_eq!(row.payload, payload);
    }

    #[test]
    fn test_duplicate_conditions_collapse_first_wins() {
        let mut payload = full_study_payload();
        payload["protocolSection"]["conditionsModule"]["conditions"] =
            json!(["Hypertension", "Hypertension", "Diabetes"]);

        let transformer = transform(&payload);
        assert_eq!(transformer.conditions.len(), 2);
        assert_eq!(transformer.conditions[0].name, "Hypertension");
    }

    #[test]
    fn test_duplicate_arm_group_labels_collapse() {
        let mut payload = full_study_payload();
        payload["protocolSection"]["armsInterventionsModule"]["interventions"][0]
            ["armGroupLabels"] = json!(["Arm A", "Arm A", "Arm B"]);

        let transformer = transform(&payload);
        assert_eq!(transformer.intervention_arm_groups.len(), 2);
    }

    #[test]
    fn test_duplicate_nct_id_in_batch_last_wins() {
        let payload = full_study_payload();
        let study = validate_study(&payload).unwrap();

        let mut newer = full_study_payload();
        newer["protocolSection"]["identificationModule"]["briefTitle"] = json!("Amended Title");
        let newer_study = validate_study(&newer).unwrap();

        let mut transformer = Transformer::new();
        transformer.transform_study(&study, &payload);
        transformer.transform_study(&newer_study, &newer);

        assert_eq!(transformer.studies.len(), 1);
        assert_eq!(
            transformer.studies[0].brief_title.as_deref(),
            Some("Amended Title")
        );
        assert_eq!(transformer.raw_studies.len(), 1);
        assert_eq!(transformer.sponsors.len(), 2);
    }

    #[test]
    fn test_take_batches_orders_parents_first_and_resets() {
        let mut transformer = transform(&full_study_payload());
        let batches = transformer.take_batches();

        assert_eq!(batches[0].spec().name, "raw_studies");
        assert_eq!(batches[1].spec().name, "studies");
        assert!(batches.len() >= 2);

        assert!(transformer.is_empty());
        assert_eq!(transformer.max_buffer_len(), 0);

        // A fresh study after draining does not trip the duplicate guard
        let payload = full_study_payload();
        let study = validate_study(&payload).unwrap();
        transformer.transform_study(&study, &payload);
        assert_eq!(transformer.studies_buffered(), 1);
    }

    #[test]
    fn test_minimal_study_produces_only_parent_rows() {
        let payload = json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT00000001" },
                "statusModule": {}
            }
        });

        let mut transformer = transform(&payload);
        let batches = transformer.take_batches();
        let names: Vec<_> = batches.iter().map(|b| b.spec().name).collect();
        assert_eq!(names, vec!["raw_studies", "studies"]);
    }
}
