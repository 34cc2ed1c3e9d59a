use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User id applied when a request carries none
pub const DEFAULT_USER_ID: &str = "anonymous";

/// A symbol on a user's watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub id: i64,
    pub user_id: String,
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}

/// Alert trigger kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceAbove,
    PriceBelow,
    VolumeSpike,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub user_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    #[schema(value_type = String, example = "155.00")]
    pub target_value: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial alert update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertUpdate {
    #[serde(rename = "type")]
    pub alert_type: Option<AlertType>,
    #[schema(value_type = Option<String>, example = "160.00")]
    pub target_value: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// A holding in a user's portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: i64,
    pub user_id: String,
    pub symbol: String,
    #[schema(value_type = String, example = "10.5")]
    pub shares: Decimal,
    #[schema(value_type = String, example = "142.30")]
    pub avg_cost: Decimal,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    #[schema(value_type = Option<String>, example = "12")]
    pub shares: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "140.00")]
    pub avg_cost: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_wire_names() {
        let parsed: AlertType = serde_json::from_str("\"price_above\"").unwrap();
        assert_eq!(parsed, AlertType::PriceAbove);
        assert_eq!(
            serde_json::to_string(&AlertType::VolumeSpike).unwrap(),
            "\"volume_spike\""
        );
    }

    #[test]
    fn test_alert_update_accepts_partial_body() {
        let update: AlertUpdate = serde_json::from_str(r#"{"isActive":false}"#).unwrap();
        assert_eq!(update.is_active, Some(false));
        assert!(update.alert_type.is_none());
        assert!(update.target_value.is_none());
    }
}
