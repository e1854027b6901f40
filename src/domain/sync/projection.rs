//! Sale record projection.
//!
//! Builds the creation payload for a pipeline-system sale record from
//! canonical fields. Optional attributes use [`SparseFields`]: an attribute
//! is written only when its downstream key is configured *and* its value is
//! non-empty, so blanks never overwrite downstream defaults.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::event::CanonicalFields;
use super::ids::PersonId;
use super::normalize::normalize_phone_digits;
use super::policy::{resolve_target_stage, StageMap};

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Status of every sale record this adapter creates.
pub const OPEN_STATUS: &str = "open";

/// Optional attributes that can be copied into custom fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraField {
    Origin,
    Channel,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    InvoiceId,
    InvoiceStatus,
    PaymentMethod,
    CycleStartDate,
    CycleEndDate,
    CardBrand,
    CardLastDigits,
    Document,
    ProductId,
    OfferId,
}

impl ExtraField {
    pub const ALL: [ExtraField; 17] = [
        ExtraField::Origin,
        ExtraField::Channel,
        ExtraField::UtmSource,
        ExtraField::UtmMedium,
        ExtraField::UtmCampaign,
        ExtraField::UtmContent,
        ExtraField::UtmTerm,
        ExtraField::InvoiceId,
        ExtraField::InvoiceStatus,
        ExtraField::PaymentMethod,
        ExtraField::CycleStartDate,
        ExtraField::CycleEndDate,
        ExtraField::CardBrand,
        ExtraField::CardLastDigits,
        ExtraField::Document,
        ExtraField::ProductId,
        ExtraField::OfferId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtraField::Origin => "origin",
            ExtraField::Channel => "channel",
            ExtraField::UtmSource => "utm_source",
            ExtraField::UtmMedium => "utm_medium",
            ExtraField::UtmCampaign => "utm_campaign",
            ExtraField::UtmContent => "utm_content",
            ExtraField::UtmTerm => "utm_term",
            ExtraField::InvoiceId => "invoice_id",
            ExtraField::InvoiceStatus => "invoice_status",
            ExtraField::PaymentMethod => "payment_method",
            ExtraField::CycleStartDate => "cycle_start_date",
            ExtraField::CycleEndDate => "cycle_end_date",
            ExtraField::CardBrand => "card_brand",
            ExtraField::CardLastDigits => "card_last_digits",
            ExtraField::Document => "document",
            ExtraField::ProductId => "product_id",
            ExtraField::OfferId => "offer_id",
        }
    }
}

impl fmt::Display for ExtraField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtraField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        ExtraField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == key)
            .ok_or_else(|| format!("unknown extra field '{}'", s))
    }
}

/// Semantic extra attribute → downstream custom-field key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFieldMap(BTreeMap<ExtraField, String>);

impl ExtraFieldMap {
    /// Builds the map from configuration entries keyed by semantic name.
    ///
    /// Entries with blank downstream keys are dropped; unknown semantic
    /// names are an error.
    pub fn from_config(entries: &HashMap<String, String>) -> Result<Self, String> {
        let mut map = BTreeMap::new();
        for (name, key) in entries {
            let field = name.parse::<ExtraField>()?;
            let key = key.trim();
            if !key.is_empty() {
                map.insert(field, key.to_string());
            }
        }
        Ok(Self(map))
    }

    pub fn with(mut self, field: ExtraField, key: impl Into<String>) -> Self {
        self.0.insert(field, key.into());
        self
    }

    pub fn key_for(&self, field: ExtraField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Custom fields collected under the "configured and non-empty" rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SparseFields(BTreeMap<String, String>);

impl SparseFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// The inclusion rule for one (key, value) pair.
    pub fn should_include(key: Option<&str>, value: &str) -> bool {
        matches!(key, Some(k) if !k.trim().is_empty()) && !value.trim().is_empty()
    }

    /// Inserts the pair if it passes [`Self::should_include`]. Returns
    /// whether it was inserted.
    pub fn insert(&mut self, key: Option<&str>, value: &str) -> bool {
        match key {
            Some(k) if Self::should_include(key, value) => {
                self.0.insert(k.trim().to_string(), value.trim().to_string());
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Static inputs of the projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionSettings {
    pub pipeline_id: i64,
    pub stages: StageMap,
    pub currency: String,
    pub deal_owner_id: Option<i64>,
    /// Custom-field key that stores the subscription code.
    pub subscription_field: Option<String>,
    pub extra_fields: ExtraFieldMap,
}

/// Body of the "create sale record" call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecordPayload {
    pub title: String,
    pub person_id: PersonId,
    pub pipeline_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<i64>,
    pub value: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    pub status: &'static str,
    pub expected_close_date: String,
    #[serde(flatten)]
    pub custom_fields: SparseFields,
}

/// `(<phone digits>) (<plan>)` when a phone is known, else `<plan> – <name>`.
pub fn build_title(fields: &CanonicalFields) -> String {
    let digits = normalize_phone_digits(&fields.phone_raw);
    if digits.is_empty() {
        format!("{} – {}", fields.plan_name, fields.full_name)
    } else {
        format!("({}) ({})", digits, fields.plan_name)
    }
}

pub fn build_sale_record_payload(
    fields: &CanonicalFields,
    person_id: PersonId,
    settings: &ProjectionSettings,
) -> SaleRecordPayload {
    let mut custom_fields = SparseFields::new();
    custom_fields.insert(
        settings.subscription_field.as_deref(),
        &fields.subscription_code,
    );
    for (field, value) in &fields.extras {
        custom_fields.insert(settings.extra_fields.key_for(*field), value);
    }

    let currency = if settings.currency.trim().is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        settings.currency.clone()
    };

    SaleRecordPayload {
        title: build_title(fields),
        person_id,
        pipeline_id: settings.pipeline_id,
        stage_id: resolve_target_stage(&fields.last_status, &fields.invoice_status, &settings.stages),
        value: fields.recurring_value,
        currency,
        owner_id: settings.deal_owner_id,
        status: OPEN_STATUS,
        expected_close_date: fields.expected_close_date.clone(),
        custom_fields,
    }
}
