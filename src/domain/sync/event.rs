//! Subscription events and their canonical fields.
//!
//! Source payloads are loosely structured: most paths are optional, values
//! arrive as strings or numbers interchangeably, and the same datum may live
//! under the subscriber or under the last transaction. All of that is
//! resolved here, once, into [`CanonicalFields`]. Nothing downstream reads the
//! raw payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::normalize::{resolve_expected_close_date, to_e164, CloseDateRule};
use super::policy::is_cancellation_event;
use super::projection::ExtraField;

/// Event type that this adapter acts on.
pub const SUBSCRIPTION_WEBHOOK_TYPE: &str = "subscription";

/// Placeholder name for subscribers without one.
pub const UNNAMED_SUBSCRIBER: &str = "Assinante (sem nome)";

/// Placeholder plan name when no product name is present.
pub const DEFAULT_PLAN_NAME: &str = "Plano";

/// Status used when the event carries none.
pub const UNKNOWN_STATUS: &str = "unknown";

/// A raw subscription event as delivered by the billing platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionEvent {
    raw: Map<String, Value>,
}

impl SubscriptionEvent {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Wraps a JSON value; only objects are events.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(raw) => Some(Self { raw }),
            _ => None,
        }
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Declared `webhook_type`, if any.
    pub fn webhook_type(&self) -> Option<String> {
        self.text(&["webhook_type"])
    }

    /// Events without a declared type are treated as subscription events.
    pub fn is_subscription_event(&self) -> bool {
        match self.webhook_type() {
            Some(kind) => kind == SUBSCRIPTION_WEBHOOK_TYPE,
            None => true,
        }
    }

    fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.raw.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Non-empty, trimmed text at `path`. Numbers are rendered as text;
    /// booleans are not text.
    pub fn text(&self, path: &[&str]) -> Option<String> {
        let text = match self.lookup(path)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First non-empty text across several paths.
    pub fn first_text(&self, paths: &[&[&str]]) -> Option<String> {
        paths.iter().find_map(|path| self.text(path))
    }

    /// Non-zero number at `path`; numeric strings are accepted.
    pub fn number(&self, path: &[&str]) -> Option<f64> {
        let number = match self.lookup(path)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
            _ => return None,
        };
        if number == 0.0 || !number.is_finite() {
            None
        } else {
            Some(number)
        }
    }

    /// First non-zero number across several paths.
    pub fn first_number(&self, paths: &[&[&str]]) -> Option<f64> {
        paths.iter().find_map(|path| self.number(path))
    }

    /// Loose truthiness: `true`, non-zero numbers, and strings such as
    /// `"true"`, `"1"`, `"yes"`, `"sim"`.
    pub fn flag(&self, path: &[&str]) -> bool {
        match self.lookup(path) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "sim" | "y" | "s"
            ),
            _ => false,
        }
    }

    /// Raw value for one of the optional extra attributes.
    pub fn extra_value(&self, field: ExtraField) -> Option<String> {
        let paths: &[&[&str]] = match field {
            ExtraField::Origin => &[&["origin"], &["last_transaction", "source", "checkout_source"]],
            ExtraField::Channel => &[&["channel"], &["last_transaction", "source", "src"]],
            ExtraField::UtmSource => &[&["utm_source"], &["last_transaction", "source", "utm_source"]],
            ExtraField::UtmMedium => &[&["utm_medium"], &["last_transaction", "source", "utm_medium"]],
            ExtraField::UtmCampaign => {
                &[&["utm_campaign"], &["last_transaction", "source", "utm_campaign"]]
            }
            ExtraField::UtmContent => {
                &[&["utm_content"], &["last_transaction", "source", "utm_content"]]
            }
            ExtraField::UtmTerm => &[&["utm_term"], &["last_transaction", "source", "utm_term"]],
            ExtraField::InvoiceId => {
                &[&["current_invoice", "id"], &["last_transaction", "invoice", "id"]]
            }
            ExtraField::InvoiceStatus => {
                &[&["current_invoice", "status"], &["last_transaction", "invoice", "status"]]
            }
            ExtraField::PaymentMethod => {
                &[&["payment_method"], &["last_transaction", "payment", "method"]]
            }
            ExtraField::CycleStartDate => {
                &[&["dates", "cycle_start_date"], &["current_invoice", "period_start"]]
            }
            ExtraField::CycleEndDate => {
                &[&["dates", "cycle_end_date"], &["current_invoice", "period_end"]]
            }
            ExtraField::CardBrand => &[
                &["credit_card", "brand"],
                &["last_transaction", "payment", "credit_card", "brand"],
            ],
            ExtraField::CardLastDigits => &[
                &["credit_card", "last_digits"],
                &["last_transaction", "payment", "credit_card", "last_digits"],
            ],
            ExtraField::Document => &[&["subscriber", "doc"], &["last_transaction", "contact", "doc"]],
            ExtraField::ProductId => &[&["product", "id"], &["last_transaction", "product", "id"]],
            ExtraField::OfferId => &[
                &["product", "offer", "id"],
                &["last_transaction", "product", "offer", "id"],
            ],
        };
        self.first_text(paths)
    }
}

/// Options that influence canonical extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Country calling code for E.164 formatting.
    pub country_code: String,
    /// How the expected close date is derived from period ends.
    pub close_date_rule: CloseDateRule,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            country_code: super::normalize::DEFAULT_COUNTRY_CODE.to_string(),
            close_date_rule: CloseDateRule::default(),
        }
    }
}

/// Normalized, defaulted values derived from one event.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFields {
    pub email: String,
    pub full_name: String,
    pub phone_raw: String,
    pub phone_e164: Option<String>,
    pub subscription_code: String,
    pub plan_name: String,
    pub recurring_value: f64,
    pub last_status: String,
    pub invoice_status: String,
    pub billing_cycle_number: u32,
    pub expected_close_date: String,
    pub is_cancellation: bool,
    pub extras: BTreeMap<ExtraField, String>,
}

impl CanonicalFields {
    /// Extracts canonical fields using the current time for date fallbacks.
    pub fn extract(event: &SubscriptionEvent, options: &ExtractionOptions) -> Self {
        Self::extract_at(event, options, Utc::now())
    }

    /// Extracts canonical fields relative to a fixed "today".
    pub fn extract_at(
        event: &SubscriptionEvent,
        options: &ExtractionOptions,
        today: DateTime<Utc>,
    ) -> Self {
        let email = event
            .first_text(&[&["subscriber", "email"], &["last_transaction", "contact", "email"]])
            .unwrap_or_default();

        let full_name = event
            .first_text(&[&["subscriber", "name"], &["last_transaction", "contact", "name"]])
            .unwrap_or_else(|| UNNAMED_SUBSCRIBER.to_string());

        let phone_raw = event
            .first_text(&[
                &["subscriber", "phone_number"],
                &["subscriber", "phone"],
                &["last_transaction", "contact", "phone_number"],
                &["last_transaction", "contact", "phone"],
            ])
            .unwrap_or_default();
        let phone_e164 = to_e164(&phone_raw, &options.country_code);

        let subscription_code = event
            .first_text(&[&["subscription_code"], &["id"], &["internal_id"]])
            .unwrap_or_default();

        let plan_name = event
            .first_text(&[
                &["product", "name"],
                &["next_product", "name"],
                &["last_transaction", "product", "name"],
            ])
            .unwrap_or_else(|| DEFAULT_PLAN_NAME.to_string());

        let recurring_value = event
            .first_number(&[&["current_invoice", "value"], &["last_transaction", "invoice", "value"]])
            .unwrap_or(0.0);

        let last_status = event
            .text(&["last_status"])
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

        let invoice_status = event
            .first_text(&[&["current_invoice", "status"], &["last_transaction", "invoice", "status"]])
            .unwrap_or_default();

        let billing_cycle_number = event
            .first_number(&[&["current_invoice", "cycle"], &["last_transaction", "invoice", "cycle"]])
            .filter(|n| *n > 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32)
            .unwrap_or(0);

        let expected_close_date =
            resolve_expected_close_date(event, options.close_date_rule, today);

        let extras = ExtraField::ALL
            .iter()
            .filter_map(|field| event.extra_value(*field).map(|value| (*field, value)))
            .collect();

        Self {
            email,
            full_name,
            phone_raw,
            phone_e164,
            subscription_code,
            plan_name,
            recurring_value,
            last_status,
            invoice_status,
            billing_cycle_number,
            expected_close_date,
            is_cancellation: is_cancellation_event(event),
            extras,
        }
    }

    pub fn has_subscription_code(&self) -> bool {
        !self.subscription_code.is_empty()
    }
}
