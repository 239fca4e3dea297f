//! Support ticket endpoints, including the chat thread.
//!
//! Chat liveness is poll-based: clients call the messages endpoint with a
//! `since` cursor every few seconds. The employee-facing message endpoint
//! is unauthenticated by design, mirroring the support widget that runs in
//! the employee's browser without an operator session; it validates only
//! that the employee exists and owns the ticket.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, RequireManager};
use crate::error::ApiError;
use crate::routes::PaginatedResponse;
use crate::state::AppState;
use fd_core::db::{
    create_employee_repository, create_sla_policy_repository, create_ticket_repository,
    create_user_repository, Pagination, TicketFilter, TicketUpdate,
};
use fd_core::models::{ChatMessage, SupportTicket, TicketPriority, TicketStatus};
use fd_core::{ChatPartner, DeskEvent};

/// Creates ticket routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route(
            "/:id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route("/:id/status", post(set_status))
        .route("/:id/assign", post(assign_ticket))
        .route("/:id/messages", get(list_messages).post(post_agent_message))
        .route("/:id/employee-messages", post(post_employee_message))
        .route("/:id/chat-partner", get(chat_partner))
}

// ============================================================================
// DTOs
// ============================================================================

/// Query parameters for listing tickets.
#[derive(Debug, Deserialize, Validate)]
pub struct ListTicketsQuery {
    /// Filter by status (comma-separated).
    pub status: Option<String>,
    /// Filter by priority (comma-separated).
    pub priority: Option<String>,
    /// Filter by requesting employee.
    pub requester_id: Option<Uuid>,
    /// Filter by assigned user.
    pub assignee_id: Option<Uuid>,
    /// Search over subject and description.
    pub search: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Request body for creating a ticket.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    pub description: Option<String>,
    /// Priority: low, medium, high, or critical.
    pub priority: String,
    /// Employee raising the ticket.
    pub requester_id: Uuid,
}

/// Request body for updating a ticket.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
}

/// Request body for a status change.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    /// New status: open, in_progress, waiting, resolved, or closed.
    pub status: String,
}

/// Request body for assigning a ticket.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignTicketRequest {
    /// User taking the ticket.
    pub assignee_id: Uuid,
}

/// Query parameters for polling messages.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Only messages after this cursor (RFC 3339).
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

/// Request body for an agent chat message.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AgentMessageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
}

/// Request body for an employee chat message.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmployeeMessageRequest {
    /// The employee writing the message.
    pub employee_id: Uuid,
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
}

/// Ticket response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketResponse {
    pub id: Uuid,
    pub subject: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub requester_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub response_due_at: Option<chrono::DateTime<chrono::Utc>>,
    pub resolution_due_at: Option<chrono::DateTime<chrono::Utc>>,
    pub first_response_at: Option<chrono::DateTime<chrono::Utc>>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Chat message response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender: String,
    pub sender_id: Option<Uuid>,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Chat partner response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatPartnerResponse {
    /// Who answered last: bot, agent, or nobody.
    pub partner: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List tickets with pagination and filters.
async fn list_tickets(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<PaginatedResponse<TicketResponse>>, ApiError> {
    query.validate()?;

    let filter = TicketFilter {
        status: query
            .status
            .as_deref()
            .map(parse_status_list)
            .transpose()?,
        priority: query
            .priority
            .as_deref()
            .map(parse_priority_list)
            .transpose()?,
        requester_id: query.requester_id,
        assignee_id: query.assignee_id,
        search: query.search,
    };
    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_ticket_repository(&state.db);
    let result = repo.list(&filter, &pagination).await?;

    Ok(Json(PaginatedResponse::from_result(result, |t| {
        ticket_to_response(&t)
    })))
}

/// Create a ticket, stamping SLA deadlines from the priority's policy.
async fn create_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    request.validate()?;

    let priority = parse_priority(&request.priority)?;

    let employees = create_employee_repository(&state.db);
    employees.get(request.requester_id).await?.ok_or_else(|| {
        ApiError::NotFound(format!("Employee {} not found", request.requester_id))
    })?;

    let mut ticket = SupportTicket::new(request.subject, priority, request.requester_id);
    ticket.description = request.description;

    // Deadlines come from the policy matching the priority, when one is
    // configured. Computed once; policy edits never restamp.
    let policies = create_sla_policy_repository(&state.db);
    if let Some(policy) = policies.get_by_priority(priority).await? {
        ticket.apply_sla(&policy);
    }

    let repo = create_ticket_repository(&state.db);
    let ticket = repo.create(&ticket).await?;

    metrics::counter!("fd_tickets_created_total").increment(1);
    state.event_bus.publish(DeskEvent::TicketCreated {
        ticket_id: ticket.id,
        priority: ticket.priority,
    });

    Ok((StatusCode::CREATED, Json(ticket_to_response(&ticket))))
}

/// Get ticket by ID.
async fn get_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketResponse>, ApiError> {
    let repo = create_ticket_repository(&state.db);
    let ticket = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {} not found", id)))?;

    Ok(Json(ticket_to_response(&ticket)))
}

/// Update a ticket's subject, description, or priority.
async fn update_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTicketRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    request.validate()?;

    let update = TicketUpdate {
        subject: request.subject,
        description: request.description,
        priority: request
            .priority
            .as_deref()
            .map(parse_priority)
            .transpose()?,
    };

    let repo = create_ticket_repository(&state.db);
    let ticket = repo.update(id, &update).await?;

    Ok(Json(ticket_to_response(&ticket)))
}

/// Move a ticket to a new status.
async fn set_status(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    let status = parse_status(&request.status)?;

    let repo = create_ticket_repository(&state.db);
    let ticket = repo.set_status(id, status).await?;

    if ticket.is_closed() {
        metrics::counter!("fd_tickets_resolved_total").increment(1);
        // The requester's next conversation starts with the bot again.
        state.chat.reset_after_resolution(&ticket).await?;
    }

    state.event_bus.publish(DeskEvent::TicketStatusChanged {
        ticket_id: ticket.id,
        status: ticket.status,
    });

    Ok(Json(ticket_to_response(&ticket)))
}

/// Assign a ticket to a user.
async fn assign_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTicketRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    let users = create_user_repository(&state.db);
    let assignee = users
        .get(request.assignee_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", request.assignee_id)))?;

    if !assignee.enabled {
        return Err(ApiError::Conflict(format!(
            "User '{}' is disabled",
            assignee.username
        )));
    }

    let repo = create_ticket_repository(&state.db);
    let ticket = repo.assign(id, assignee.id).await?;

    Ok(Json(ticket_to_response(&ticket)))
}

/// Delete a ticket and its chat thread.
async fn delete_ticket(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_ticket_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Ticket {} not found", id)))
    }
}

// ============================================================================
// Chat handlers
// ============================================================================

/// Messages on a ticket, ascending; `since` is the polling cursor.
///
/// Unauthenticated so the employee-facing widget can poll it too.
async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let messages = state.chat.messages_since(id, query.since).await?;

    Ok(Json(messages.iter().map(message_to_response).collect()))
}

/// Post a message as a support agent.
async fn post_agent_message(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AgentMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    request.validate()?;

    let message = state
        .chat
        .post_agent_message(id, user.id, &request.body)
        .await?;

    metrics::counter!("fd_chat_messages_total").increment(1);

    Ok((StatusCode::CREATED, Json(message_to_response(&message))))
}

/// Post a message from the employee-facing widget.
///
/// Returns everything appended to the thread: the employee's message plus
/// any bot reply or handoff notice, so the widget renders the exchange
/// without waiting for the next poll.
async fn post_employee_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EmployeeMessageRequest>,
) -> Result<(StatusCode, Json<Vec<MessageResponse>>), ApiError> {
    request.validate()?;

    let appended = state
        .chat
        .post_employee_message(id, request.employee_id, &request.body)
        .await?;

    metrics::counter!("fd_chat_messages_total").increment(appended.len() as u64);
    if appended
        .iter()
        .any(|m| m.sender == fd_core::models::MessageSender::System)
    {
        metrics::counter!("fd_chat_handoffs_total").increment(1);
    }

    Ok((
        StatusCode::CREATED,
        Json(appended.iter().map(message_to_response).collect()),
    ))
}

/// Who answered the employee last on this ticket.
async fn chat_partner(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatPartnerResponse>, ApiError> {
    let partner = state.chat.chat_partner(id).await?;

    let partner = match partner {
        ChatPartner::Bot => "bot",
        ChatPartner::Agent => "agent",
        ChatPartner::Nobody => "nobody",
    };

    Ok(Json(ChatPartnerResponse {
        partner: partner.to_string(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn ticket_to_response(ticket: &SupportTicket) -> TicketResponse {
    TicketResponse {
        id: ticket.id,
        subject: ticket.subject.clone(),
        description: ticket.description.clone(),
        status: ticket.status.to_string(),
        priority: ticket.priority.to_string(),
        requester_id: ticket.requester_id,
        assignee_id: ticket.assignee_id,
        response_due_at: ticket.response_due_at,
        resolution_due_at: ticket.resolution_due_at,
        first_response_at: ticket.first_response_at,
        resolved_at: ticket.resolved_at,
        created_at: ticket.created_at,
        updated_at: ticket.updated_at,
    }
}

fn message_to_response(message: &ChatMessage) -> MessageResponse {
    MessageResponse {
        id: message.id,
        ticket_id: message.ticket_id,
        sender: message.sender.to_string(),
        sender_id: message.sender_id,
        body: message.body.clone(),
        created_at: message.created_at,
    }
}

fn parse_status(s: &str) -> Result<TicketStatus, ApiError> {
    TicketStatus::from_db_str(&s.to_lowercase()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid status: {}. Must be one of: open, in_progress, waiting, resolved, closed",
            s
        ))
    })
}

fn parse_priority(s: &str) -> Result<TicketPriority, ApiError> {
    TicketPriority::from_db_str(&s.to_lowercase()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid priority: {}. Must be one of: low, medium, high, critical",
            s
        ))
    })
}

fn parse_status_list(s: &str) -> Result<Vec<TicketStatus>, ApiError> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_status)
        .collect()
}

fn parse_priority_list(s: &str) -> Result<Vec<TicketPriority>, ApiError> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_priority)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_list() {
        let statuses = parse_status_list("open, in_progress").unwrap();
        assert_eq!(statuses, vec![TicketStatus::Open, TicketStatus::InProgress]);
        assert!(parse_status_list("open,bogus").is_err());
    }

    #[test]
    fn test_parse_priority_list() {
        let priorities = parse_priority_list("high,critical").unwrap();
        assert_eq!(
            priorities,
            vec![TicketPriority::High, TicketPriority::Critical]
        );
    }

    #[test]
    fn test_ticket_to_response() {
        let ticket = SupportTicket::new("VPN down", TicketPriority::High, Uuid::new_v4());
        let response = ticket_to_response(&ticket);
        assert_eq!(response.status, "open");
        assert_eq!(response.priority, "high");
        assert!(response.resolved_at.is_none());
    }
}
