//! Entry points for the foreground flow. Errors come back as the text shown
//! to the agent.

use crate::{
    models::VisitTask,
    store::TOKEN_KEY,
    visit::{CompletedVisit, StopReceipt, VisitController, VisitSnapshot, VisitState},
    AgentState,
};

fn controller_from_state(state: &AgentState) -> VisitController {
    state.visits.clone()
}

pub async fn start_visit(state: &AgentState, task_id: String) -> Result<VisitState, String> {
    let controller = controller_from_state(state);
    controller
        .start_visit(&task_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn resume_visit(state: &AgentState) -> Result<Option<String>, String> {
    let controller = controller_from_state(state);
    controller.resume().await.map_err(|e| e.to_string())
}

pub async fn stop_visit(state: &AgentState) -> Result<Option<StopReceipt>, String> {
    let controller = controller_from_state(state);
    controller.stop_visit().await.map_err(|e| e.to_string())
}

pub async fn complete_visit(state: &AgentState, task_id: String) -> Result<CompletedVisit, String> {
    let controller = controller_from_state(state);
    controller
        .complete_visit(&task_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_visit_state(state: &AgentState) -> Result<VisitSnapshot, String> {
    let controller = controller_from_state(state);
    controller.snapshot().await.map_err(|e| e.to_string())
}

pub async fn list_tasks(state: &AgentState) -> Result<Vec<VisitTask>, String> {
    state.api.list_tasks().await.map_err(|e| e.to_string())
}

pub async fn save_token(state: &AgentState, token: String) -> Result<(), String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("token must not be empty".into());
    }
    state
        .store
        .set(TOKEN_KEY, token)
        .await
        .map_err(|e| e.to_string())
}
