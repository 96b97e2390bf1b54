use serde::Deserialize;

/// Body of `POST /passes`. Everything else on the pass comes from the caller's profile.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePassRequest {
    pub phone_number: Option<String>,
    pub parent_phone_number: Option<String>,
    pub departure_date: Option<String>,
    pub location: Option<String>,
    pub reason: Option<String>,
    pub hostel: Option<String>,
}
