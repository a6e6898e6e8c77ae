//! Seller profile and login payload models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seller account verification state as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

/// Subscription tier for the seller account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Basic,
    Pro,
    Enterprise,
}

/// The seller profile owned by the auth controller.
///
/// Mutated only through `login()`, `refresh_user_data()` and
/// `update_seller_profile()`; everything else gets a clone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellerProfile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub subscription_plan: SubscriptionPlan,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

/// Wire-level seller payload with every field optional.
///
/// Used both for profile responses (which may omit fields) and for
/// partial-update requests, where `None` fields are left off the JSON body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SellerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<SubscriptionPlan>,
}

impl SellerProfile {
    /// Build a profile from a login/profile payload.
    ///
    /// Returns `None` unless `id` and `name` are present - those two fields
    /// are required for a session to be considered authenticated.
    pub fn from_payload(payload: &SellerPayload) -> Option<Self> {
        let id = payload.id?;
        let name = payload.name.clone()?;
        Some(Self {
            id,
            name,
            shop_name: payload.shop_name.clone().unwrap_or_default(),
            phone: payload.phone.clone(),
            email: payload.email.clone(),
            business_type: payload.business_type.clone(),
            address: payload.address.clone(),
            city: payload.city.clone(),
            state: payload.state.clone(),
            pincode: payload.pincode.clone(),
            gst_number: payload.gst_number.clone(),
            verification_status: payload.verification_status.unwrap_or_default(),
            subscription_plan: payload.subscription_plan.unwrap_or_default(),
            last_login: None,
        })
    }

    /// Merge response fields over this profile, keeping anything the
    /// server omitted.
    pub fn merge(&mut self, payload: &SellerPayload) {
        if let Some(id) = payload.id {
            self.id = id;
        }
        if let Some(ref name) = payload.name {
            self.name = name.clone();
        }
        if let Some(ref shop_name) = payload.shop_name {
            self.shop_name = shop_name.clone();
        }
        if payload.phone.is_some() {
            self.phone = payload.phone.clone();
        }
        if payload.email.is_some() {
            self.email = payload.email.clone();
        }
        if payload.business_type.is_some() {
            self.business_type = payload.business_type.clone();
        }
        if payload.address.is_some() {
            self.address = payload.address.clone();
        }
        if payload.city.is_some() {
            self.city = payload.city.clone();
        }
        if payload.state.is_some() {
            self.state = payload.state.clone();
        }
        if payload.pincode.is_some() {
            self.pincode = payload.pincode.clone();
        }
        if payload.gst_number.is_some() {
            self.gst_number = payload.gst_number.clone();
        }
        if let Some(status) = payload.verification_status {
            self.verification_status = status;
        }
        if let Some(plan) = payload.subscription_plan {
            self.subscription_plan = plan;
        }
    }
}

/// Response body from the login endpoint, validated by the controller
/// before any storage mutation happens.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub seller: Option<SellerPayload>,
}
