//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ErrorResponse, SendMessageRequest};
use super::AppState;
use crate::a2a::{AgentCard, Message, Role, Task, TaskState, TaskStatus};
use crate::runtime::{ChannelPublisher, TaskStore, TaskTracker, TurnRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Agent discovery
        .route("/.well-known/agent.json", get(get_agent_card))
        // Turns
        .route("/api/message/stream", post(stream_message))
        .route("/api/message/send", post(send_message))
        // Tasks
        .route("/api/tasks/:id", get(get_task))
        .route("/api/tasks/:id/cancel", post(cancel_task))
        .with_state(state)
}

async fn get_agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.agent_card.as_ref().clone())
}

// ============================================================
// Turns
// ============================================================

async fn stream_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, AppError> {
    let request = turn_request(&state, req.message).await?;
    let (publisher, events_rx) = ChannelPublisher::channel();
    let tracker = TaskTracker::new(state.tasks.clone(), publisher);

    let processor = state.processor.clone();
    tokio::spawn(async move {
        processor.process(request, &tracker).await;
    });

    Ok(sse_stream(events_rx).into_response())
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Task>, AppError> {
    let request = turn_request(&state, req.message).await?;
    let (context, request) = state.processor.prepare(request);
    let task_id = context.task_id.clone();

    let tracker = TaskTracker::standalone(state.tasks.clone());
    state
        .processor
        .process_prepared(context, request, &tracker)
        .await;

    load_task(&state, &task_id).await.map(Json)
}

/// Build a turn request, resuming the stored task the message names
async fn turn_request(state: &AppState, message: Message) -> Result<TurnRequest, AppError> {
    if message.parts.is_empty() {
        return Err(AppError::BadRequest(
            "Message must have at least one part".to_string(),
        ));
    }
    if message.role != Role::User {
        return Err(AppError::BadRequest(
            "Only user messages can start a turn".to_string(),
        ));
    }

    let Some(task_id) = message.task_id.clone() else {
        return Ok(TurnRequest::new(message));
    };

    // Check and claim under one lock; a claimed task reads as working
    let _guard = state.task_locks.acquire(&task_id).await;
    let mut task = load_task(state, &task_id).await?;
    match task.status.state {
        TaskState::Completed | TaskState::Canceled | TaskState::Failed => {
            return Err(AppError::BadRequest(format!(
                "Task {task_id} is in a terminal state ({}) and cannot be resumed",
                task.status.state
            )));
        }
        TaskState::Submitted | TaskState::Working => {
            return Err(AppError::Conflict(format!(
                "Task {task_id} already has a turn in progress"
            )));
        }
        TaskState::InputRequired | TaskState::Unknown => {}
    }

    // The resumed task records the new message before the turn starts
    let mut recorded = message.clone();
    if recorded.context_id.is_none() {
        recorded.context_id = Some(task.context_id.clone());
    }
    task.history.push(recorded);
    task.status = TaskStatus::now(TaskState::Working, None);
    state
        .tasks
        .save(task.clone())
        .await
        .map_err(AppError::Internal)?;

    Ok(TurnRequest::resuming(message, task))
}

// ============================================================
// Tasks
// ============================================================

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    load_task(&state, &id).await.map(Json)
}

async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let task = load_task(&state, &id).await?;
    state.processor.cancel(&id);
    Ok(Json(task))
}

async fn load_task(state: &AppState, id: &str) -> Result<Task, AppError> {
    state
        .tasks
        .load(id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Task {id} not found")))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
