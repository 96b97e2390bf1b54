use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::CreatePassRequest;
use super::repo_types::{NewPass, Pass, PassQuery, PassStatus};
use crate::auth::repo_types::Identity;
use crate::error::AppError;
use crate::notify::Notice;
use crate::state::AppState;

/// Returns the trimmed value of every required field, or the name of the first missing one.
fn required_fields(input: CreatePassRequest) -> Result<[String; 6], AppError> {
    let fields = [
        ("phoneNumber", input.phone_number),
        ("parentPhoneNumber", input.parent_phone_number),
        ("departureDate", input.departure_date),
        ("location", input.location),
        ("reason", input.reason),
        ("hostel", input.hostel),
    ];

    let mut out: [String; 6] = Default::default();
    for (slot, (name, value)) in out.iter_mut().zip(fields) {
        match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(v) => *slot = v,
            None => {
                return Err(AppError::validation(format!(
                    "Please enter all fields: {name} is required"
                )))
            }
        }
    }
    Ok(out)
}

#[instrument(skip(st, identity, input), fields(user_id = %identity.id))]
pub async fn create_pass(
    st: &AppState,
    identity: &Identity,
    input: CreatePassRequest,
) -> Result<Pass, AppError> {
    let [phone_number, parent_phone_number, departure_date, location, reason, hostel] =
        required_fields(input)?;

    let pass = st
        .passes
        .insert(NewPass {
            user_id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            matric_number: identity.matric_number.clone(),
            department: identity.department.clone(),
            faculty: identity.faculty.clone(),
            phone_number,
            parent_phone_number,
            departure_date,
            location,
            hostel,
            reason,
        })
        .await?;

    info!(pass_id = %pass.id, "pass created");
    st.notifier.dispatch(Notice::PassCreated(pass.clone()));
    Ok(pass)
}

pub async fn list_all(st: &AppState, keyword: Option<String>) -> Result<Vec<Pass>, AppError> {
    let query = PassQuery {
        keyword,
        ..Default::default()
    };
    Ok(st.passes.list(&query).await?)
}

pub async fn list_mine(
    st: &AppState,
    identity: &Identity,
    keyword: Option<String>,
) -> Result<Vec<Pass>, AppError> {
    let query = PassQuery {
        owner: Some(identity.id),
        keyword,
        ..Default::default()
    };
    Ok(st.passes.list(&query).await?)
}

pub async fn list_by_user(st: &AppState, user_id: Uuid) -> Result<Vec<Pass>, AppError> {
    let query = PassQuery {
        owner: Some(user_id),
        ..Default::default()
    };
    Ok(st.passes.list(&query).await?)
}

pub async fn list_by_status(
    st: &AppState,
    status: PassStatus,
    keyword: Option<String>,
) -> Result<Vec<Pass>, AppError> {
    let query = PassQuery {
        status: Some(status),
        keyword,
        ..Default::default()
    };
    Ok(st.passes.list(&query).await?)
}

/// Any authenticated caller may read any pass; there is no ownership check.
pub async fn get_by_id(st: &AppState, id: Uuid) -> Result<Pass, AppError> {
    st.passes
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Pass not found"))
}

/// Sets the status unconditionally; the current status is not consulted,
/// so repeated or reversing transitions succeed.
#[instrument(skip(st, notice))]
async fn transition(
    st: &AppState,
    id: Uuid,
    status: PassStatus,
    notice: fn(Pass) -> Notice,
) -> Result<Pass, AppError> {
    let Some(pass) = st.passes.set_status(id, status).await? else {
        warn!(pass_id = %id, "transition on missing pass");
        return Err(AppError::not_found("Pass not found"));
    };

    info!(pass_id = %pass.id, status = %pass.status, "pass status changed");
    st.notifier.dispatch(notice(pass.clone()));
    Ok(pass)
}

pub async fn approve(st: &AppState, id: Uuid) -> Result<Pass, AppError> {
    transition(st, id, PassStatus::Approved, Notice::PassApproved).await
}

pub async fn reject(st: &AppState, id: Uuid) -> Result<Pass, AppError> {
    transition(st, id, PassStatus::Rejected, Notice::PassRejected).await
}
