use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppError;

/// Which checkout flow produced an order. Carried in the payment-intent
/// metadata so the webhook can reconstruct the flow without re-querying the
/// original request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderFlow {
    Individual,
    IndividualAtTable,
    FullTable,
    CaptainCommitment,
}

impl Display for OrderFlow {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OrderFlow::Individual => write!(f, "individual"),
            OrderFlow::IndividualAtTable => write!(f, "individual_at_table"),
            OrderFlow::FullTable => write!(f, "full_table"),
            OrderFlow::CaptainCommitment => write!(f, "captain_commitment"),
        }
    }
}

impl FromStr for OrderFlow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(OrderFlow::Individual),
            "individual_at_table" => Ok(OrderFlow::IndividualAtTable),
            "full_table" => Ok(OrderFlow::FullTable),
            "captain_commitment" => Ok(OrderFlow::CaptainCommitment),
            _ => Err(anyhow::anyhow!("Invalid order flow: {}", s)),
        }
    }
}

/// Payment-intent metadata bag.
///
/// Serialized to string key-value pairs at the provider boundary and parsed
/// strictly on the way back in. Treated as untrusted input even though this
/// server wrote it: every field is validated, missing required keys are hard
/// failures that leave the webhook event unprocessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentMetadata {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    /// Seat quantity of the order. For full-table purchases this is the table
    /// capacity and doubles as the capacity of the table created at
    /// reconciliation time.
    pub quantity: i32,
    pub table_id: Option<Uuid>,
    pub promo_code_id: Option<Uuid>,
    pub order_flow: OrderFlow,
    pub table_name: Option<String>,
}

const KEY_EVENT_ID: &str = "event_id";
const KEY_USER_ID: &str = "user_id";
const KEY_PRODUCT_ID: &str = "product_id";
const KEY_QUANTITY: &str = "quantity";
const KEY_TABLE_ID: &str = "table_id";
const KEY_PROMO_CODE_ID: &str = "promo_code_id";
const KEY_ORDER_FLOW: &str = "order_flow";
const KEY_TABLE_NAME: &str = "table_name";

fn require<'a>(pairs: &'a HashMap<String, String>, key: &str) -> Result<&'a str, AppError> {
    pairs
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Payment metadata is missing required key: {}", key))
        })
}

fn parse_uuid(key: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::InvalidInput(format!("Payment metadata key {} is not a UUID", key)))
}

impl PaymentIntentMetadata {
    /// Flatten to the string pairs the provider stores. Optional fields are
    /// omitted rather than serialized as empty strings.
    pub fn to_pairs(&self) -> HashMap<String, String> {
        let mut pairs = HashMap::new();
        pairs.insert(KEY_EVENT_ID.to_string(), self.event_id.to_string());
        pairs.insert(KEY_USER_ID.to_string(), self.user_id.to_string());
        pairs.insert(KEY_PRODUCT_ID.to_string(), self.product_id.to_string());
        pairs.insert(KEY_QUANTITY.to_string(), self.quantity.to_string());
        pairs.insert(KEY_ORDER_FLOW.to_string(), self.order_flow.to_string());
        if let Some(table_id) = self.table_id {
            pairs.insert(KEY_TABLE_ID.to_string(), table_id.to_string());
        }
        if let Some(promo_code_id) = self.promo_code_id {
            pairs.insert(KEY_PROMO_CODE_ID.to_string(), promo_code_id.to_string());
        }
        if let Some(ref table_name) = self.table_name {
            pairs.insert(KEY_TABLE_NAME.to_string(), table_name.clone());
        }
        pairs
    }

    /// Strict parse from provider metadata. Missing event/user/product ids are
    /// hard failures per the reconciliation contract.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Result<Self, AppError> {
        let event_id = parse_uuid(KEY_EVENT_ID, require(pairs, KEY_EVENT_ID)?)?;
        let user_id = parse_uuid(KEY_USER_ID, require(pairs, KEY_USER_ID)?)?;
        let product_id = parse_uuid(KEY_PRODUCT_ID, require(pairs, KEY_PRODUCT_ID)?)?;

        let quantity: i32 = require(pairs, KEY_QUANTITY)?.parse().map_err(|_| {
            AppError::InvalidInput("Payment metadata key quantity is not an integer".to_string())
        })?;
        if quantity < 1 {
            return Err(AppError::InvalidInput(
                "Payment metadata quantity must be positive".to_string(),
            ));
        }

        let order_flow: OrderFlow = require(pairs, KEY_ORDER_FLOW)?
            .parse()
            .map_err(|e| AppError::InvalidInput(format!("Payment metadata: {}", e)))?;

        let table_id = match pairs.get(KEY_TABLE_ID).filter(|v| !v.is_empty()) {
            Some(v) => Some(parse_uuid(KEY_TABLE_ID, v)?),
            None => None,
        };
        let promo_code_id = match pairs.get(KEY_PROMO_CODE_ID).filter(|v| !v.is_empty()) {
            Some(v) => Some(parse_uuid(KEY_PROMO_CODE_ID, v)?),
            None => None,
        };
        let table_name = pairs
            .get(KEY_TABLE_NAME)
            .filter(|v| !v.is_empty())
            .cloned();

        Ok(Self {
            event_id,
            user_id,
            product_id,
            quantity,
            table_id,
            promo_code_id,
            order_flow,
            table_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaymentIntentMetadata {
        PaymentIntentMetadata {
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 10,
            table_id: None,
            promo_code_id: Some(Uuid::new_v4()),
            order_flow: OrderFlow::FullTable,
            table_name: Some("The Patrons".to_string()),
        }
    }

    #[test]
    fn test_round_trip() {
        let metadata = sample();
        let parsed = PaymentIntentMetadata::from_pairs(&metadata.to_pairs()).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        let mut pairs = sample().to_pairs();
        pairs.remove("user_id");
        let err = PaymentIntentMetadata::from_pairs(&pairs).unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_empty_required_value_is_rejected() {
        let mut pairs = sample().to_pairs();
        pairs.insert("product_id".to_string(), String::new());
        assert!(PaymentIntentMetadata::from_pairs(&pairs).is_err());
    }

    #[test]
    fn test_malformed_uuid_is_rejected() {
        let mut pairs = sample().to_pairs();
        pairs.insert("event_id".to_string(), "not-a-uuid".to_string());
        assert!(PaymentIntentMetadata::from_pairs(&pairs).is_err());
    }

    #[test]
    fn test_nonpositive_quantity_is_rejected() {
        let mut pairs = sample().to_pairs();
        pairs.insert("quantity".to_string(), "0".to_string());
        assert!(PaymentIntentMetadata::from_pairs(&pairs).is_err());
    }

    #[test]
    fn test_optional_fields_are_omitted_when_absent() {
        let mut metadata = sample();
        metadata.table_id = None;
        metadata.promo_code_id = None;
        metadata.table_name = None;
        let pairs = metadata.to_pairs();
        assert!(!pairs.contains_key("table_id"));
        assert!(!pairs.contains_key("promo_code_id"));
        assert!(!pairs.contains_key("table_name"));
    }

    #[test]
    fn test_order_flow_round_trip() {
        for flow in [
            OrderFlow::Individual,
            OrderFlow::IndividualAtTable,
            OrderFlow::FullTable,
            OrderFlow::CaptainCommitment,
        ] {
            assert_eq!(flow.to_string().parse::<OrderFlow>().unwrap(), flow);
        }
    }
}
