pub mod lifecycle;
pub mod token;

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::enums::TicketStatus;
use crate::core::shared::schema::tickets;
use crate::core::shared::state::AppState;
use crate::profiles::{ensure_tech, get_or_create_profile};
use lifecycle::{can_assign, can_resolve, reopen_applies, solved_fields};
use token::{generate_token, normalize_token};

/// Fresh draws attempted before giving up on a unique token.
const TOKEN_RETRY_BUDGET: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: Uuid,
    pub token: String,
    pub reporter_id: Uuid,
    pub branch: String,
    pub description: String,
    pub classification: String,
    pub severity: String,
    pub status: String,
    pub tech_notes: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub solved_by: Option<Uuid>,
    pub solved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    fn status(&self) -> TicketStatus {
        self.status.parse().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: Option<String>,
    pub tech_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub solved: i64,
}

/// Status labels satisfying a lifecycle predicate, for conditional
/// SQL updates.
fn statuses_where(pred: fn(TicketStatus) -> bool) -> Vec<&'static str> {
    TicketStatus::ALL
        .iter()
        .copied()
        .filter(|s| pred(*s))
        .map(|s| s.as_str())
        .collect()
}

fn find_by_token(
    conn: &mut PgConnection,
    tok: &str,
) -> Result<Option<Ticket>, diesel::result::Error> {
    tickets::table
        .filter(tickets::token.eq(tok))
        .first::<Ticket>(conn)
        .optional()
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(req): Json<CreateTicketRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest("description must not be empty"));
    }

    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;
    let classification = state.classifier.classify(&description);

    for _ in 0..TOKEN_RETRY_BUDGET {
        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            token: generate_token(),
            reporter_id: user.user_id,
            branch: profile.branch.clone(),
            description: description.clone(),
            classification: classification.category.clone(),
            severity: classification.severity.as_str().to_string(),
            status: TicketStatus::Pending.as_str().to_string(),
            tech_notes: None,
            assigned_to: None,
            solved_by: None,
            solved_at: None,
            created_at: now,
            updated_at: now,
        };

        match diesel::insert_into(tickets::table)
            .values(&ticket)
            .execute(&mut conn)
        {
            Ok(_) => {
                log::info!(
                    "ticket #{} created ({}, {})",
                    ticket.token,
                    ticket.classification,
                    ticket.severity
                );
                return Ok(Json(ticket));
            }
            // Token already taken: draw again.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Conflict("could not allocate a unique ticket token"))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut q = tickets::table.into_boxed();

    // Reporters only ever see their own tickets.
    if !(user.is_admin || profile.is_tech()) {
        q = q.filter(tickets::reporter_id.eq(user.user_id));
    }

    if let Some(status) = query.status {
        let status = status
            .parse::<TicketStatus>()
            .map_err(|_| ApiError::BadRequest("unknown ticket status"))?;
        q = q.filter(tickets::status.eq(status.as_str()));
    }

    let rows: Vec<Ticket> = q
        .order(tickets::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn ticket_stats(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<TicketStats>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;
    ensure_tech(&user, &profile)?;

    let total: i64 = tickets::table.count().get_result(&mut conn)?;
    let pending: i64 = tickets::table
        .filter(tickets::status.eq(TicketStatus::Pending.as_str()))
        .count()
        .get_result(&mut conn)?;
    let in_progress: i64 = tickets::table
        .filter(tickets::status.eq(TicketStatus::InProgress.as_str()))
        .count()
        .get_result(&mut conn)?;
    let solved: i64 = tickets::table
        .filter(tickets::status.eq(TicketStatus::Solved.as_str()))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(TicketStats {
        total,
        pending,
        in_progress,
        solved,
    }))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(raw_token): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;

    let tok = normalize_token(&raw_token);
    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;

    // A ticket filed by someone else does not exist as far as a
    // reporter can tell.
    if ticket.reporter_id != user.user_id && !(user.is_admin || profile.is_tech()) {
        return Err(ApiError::NotFound("ticket not found"));
    }

    Ok(Json(ticket))
}

pub async fn assign_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(raw_token): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;
    ensure_tech(&user, &profile)?;

    let tok = normalize_token(&raw_token);
    let now = Utc::now();

    // Conditional update: only a still-pending ticket can be taken, so
    // two technicians racing for it cannot both win.
    let updated = diesel::update(
        tickets::table
            .filter(tickets::token.eq(&tok))
            .filter(tickets::status.eq_any(statuses_where(can_assign))),
    )
    .set((
        tickets::status.eq(TicketStatus::InProgress.as_str()),
        tickets::assigned_to.eq(Some(user.user_id)),
        tickets::updated_at.eq(now),
    ))
    .execute(&mut conn)?;

    if updated == 0 {
        return match find_by_token(&mut conn, &tok)? {
            Some(_) => Err(ApiError::Conflict("ticket is no longer pending")),
            None => Err(ApiError::NotFound("ticket not found")),
        };
    }

    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;
    log::info!("ticket #{} assigned to {}", ticket.token, user.user_id);
    Ok(Json(ticket))
}

pub async fn resolve_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(raw_token): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;
    ensure_tech(&user, &profile)?;

    let tok = normalize_token(&raw_token);
    let now = Utc::now();

    let updated = diesel::update(
        tickets::table
            .filter(tickets::token.eq(&tok))
            .filter(tickets::status.eq_any(statuses_where(can_resolve))),
    )
    .set((
        tickets::status.eq(TicketStatus::Solved.as_str()),
        tickets::solved_by.eq(Some(user.user_id)),
        tickets::solved_at.eq(Some(now)),
        tickets::updated_at.eq(now),
    ))
    .execute(&mut conn)?;

    if updated == 0 {
        return match find_by_token(&mut conn, &tok)? {
            Some(_) => Err(ApiError::Conflict("ticket is already solved")),
            None => Err(ApiError::NotFound("ticket not found")),
        };
    }

    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;
    log::info!("ticket #{} resolved by {}", ticket.token, user.user_id);
    Ok(Json(ticket))
}

pub async fn reopen_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(raw_token): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;

    let tok = normalize_token(&raw_token);
    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;

    // Only the original reporter may reopen. For anyone who cannot see
    // the ticket at all it stays a NotFound.
    if ticket.reporter_id != user.user_id {
        let profile = get_or_create_profile(&mut conn, &user)?;
        if user.is_admin || profile.is_tech() {
            return Err(ApiError::Forbidden);
        }
        return Err(ApiError::NotFound("ticket not found"));
    }

    // Reopening a ticket that is not solved is a no-op, not an error.
    if !reopen_applies(ticket.status()) {
        return Ok(Json(ticket));
    }

    let now = Utc::now();
    diesel::update(tickets::table.filter(tickets::token.eq(&tok)))
        .set((
            tickets::status.eq(TicketStatus::Pending.as_str()),
            tickets::solved_by.eq(None::<Uuid>),
            tickets::solved_at.eq(None::<DateTime<Utc>>),
            tickets::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;
    log::info!("ticket #{} reopened by reporter", ticket.token);
    Ok(Json(ticket))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(raw_token): Path<String>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;
    ensure_tech(&user, &profile)?;

    let tok = normalize_token(&raw_token);
    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;

    let next_status = match &req.status {
        Some(raw) => raw
            .parse::<TicketStatus>()
            .map_err(|_| ApiError::BadRequest("unknown ticket status"))?,
        None => ticket.status(),
    };

    let now = Utc::now();
    let (solved_by, solved_at) = solved_fields(
        ticket.status(),
        ticket.solved_by,
        ticket.solved_at,
        next_status,
        user.user_id,
        now,
    );
    let tech_notes = req.tech_notes.or(ticket.tech_notes);

    diesel::update(tickets::table.filter(tickets::token.eq(&tok)))
        .set((
            tickets::status.eq(next_status.as_str()),
            tickets::tech_notes.eq(tech_notes),
            tickets::solved_by.eq(solved_by),
            tickets::solved_at.eq(solved_at),
            tickets::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let ticket = find_by_token(&mut conn, &tok)?.ok_or(ApiError::NotFound("ticket not found"))?;
    Ok(Json(ticket))
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/stats", get(ticket_stats))
        .route("/api/tickets/:token", get(get_ticket).put(update_ticket))
        .route("/api/tickets/:token/assign", put(assign_ticket))
        .route("/api/tickets/:token/resolve", put(resolve_ticket))
        .route("/api/tickets/:token/reopen", put(reopen_ticket))
}
