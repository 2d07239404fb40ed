use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::api::identity::Caller;
use crate::db::Store;
use crate::error::Error;
use crate::models::*;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Members
// ============================================================

pub async fn list_members(State(store): State<Store>) -> Result<Json<Vec<Member>>, Error> {
    store.get_all_members().map(Json)
}

pub async fn get_member(
    State(store): State<Store>,
    Path(id): Path<Uuid>,
) -> Result<Json<MemberWithRank>, Error> {
    store
        .get_member(id)?
        .map(MemberWithRank::from)
        .map(Json)
        .ok_or(Error::NotFound("member"))
}

pub async fn create_member(
    State(store): State<Store>,
    caller: Caller,
    Json(input): Json<CreateMemberInput>,
) -> Result<(StatusCode, Json<Member>), Error> {
    caller.require_admin()?;
    store
        .create_member(input)
        .map(|m| (StatusCode::CREATED, Json(m)))
}

pub async fn update_member(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMemberInput>,
) -> Result<Json<Member>, Error> {
    caller.require_admin()?;
    store.update_member(id, input).map(Json)
}

pub async fn delete_member(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Error> {
    caller.require_admin()?;
    if store.delete_member(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("member"))
    }
}

pub async fn leaderboard(State(store): State<Store>) -> Result<Json<Vec<MemberWithRank>>, Error> {
    store.leaderboard().map(Json)
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(State(store): State<Store>) -> Result<Json<Vec<Project>>, Error> {
    store.get_all_projects().map(Json)
}

pub async fn get_project(
    State(store): State<Store>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithMembers>, Error> {
    store
        .get_project_with_members(id)?
        .map(Json)
        .ok_or(Error::NotFound("project"))
}

pub async fn submit_project(
    State(store): State<Store>,
    caller: Caller,
    Json(input): Json<SubmitProjectInput>,
) -> Result<(StatusCode, Json<Project>), Error> {
    store
        .submit_project(caller.member_id, input)
        .map(|p| (StatusCode::CREATED, Json(p)))
}

pub async fn update_project(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<Project>, Error> {
    caller.require_admin()?;
    store.update_project(id, input).map(Json)
}

pub async fn delete_project(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Error> {
    caller.require_admin()?;
    store.delete_project(id).map(|_| StatusCode::NO_CONTENT)
}

pub async fn approve_project(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<ApproveProjectInput>,
) -> Result<Json<Project>, Error> {
    caller.require_admin()?;
    store.approve_project(id, input.points).map(Json)
}

pub async fn reject_project(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<RejectProjectInput>,
) -> Result<Json<Project>, Error> {
    caller.require_admin()?;
    store.reject_project(id, input.reason).map(Json)
}

pub async fn complete_project(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, Error> {
    caller.require_admin()?;
    store.complete_project(id).map(Json)
}

pub async fn join_project(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithMembers>, Error> {
    store.join_project(id, caller.member_id).map(Json)
}

// ============================================================
// Polls
// ============================================================

pub async fn list_polls(
    State(store): State<Store>,
    caller: Option<Caller>,
) -> Result<Json<Vec<PollView>>, Error> {
    store
        .get_all_polls(caller.map(|c| c.member_id))
        .map(Json)
}

pub async fn get_poll(
    State(store): State<Store>,
    caller: Option<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<PollView>, Error> {
    store
        .get_poll(id, caller.map(|c| c.member_id))?
        .map(Json)
        .ok_or(Error::NotFound("poll"))
}

pub async fn create_poll(
    State(store): State<Store>,
    caller: Caller,
    Json(input): Json<CreatePollInput>,
) -> Result<(StatusCode, Json<Poll>), Error> {
    store
        .create_poll(caller.member_id, input)
        .map(|p| (StatusCode::CREATED, Json(p)))
}

pub async fn vote_poll(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(input): Json<VoteInput>,
) -> Result<Json<PollView>, Error> {
    store.vote(id, caller.member_id, input.option).map(Json)
}

/// Close a poll. Allowed for the poll's author and for admins.
pub async fn close_poll(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Poll>, Error> {
    let poll = store.get_poll(id, None)?.ok_or(Error::NotFound("poll"))?;
    if !caller.is_admin && poll.poll.author_id != caller.member_id {
        return Err(Error::Forbidden("only the author or an admin can close a poll"));
    }
    store.close_poll(id).map(Json)
}

pub async fn delete_poll(
    State(store): State<Store>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Error> {
    caller.require_admin()?;
    store.delete_poll(id).map(|_| StatusCode::NO_CONTENT)
}
