mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

/// SQLite-backed store for the portal.
///
/// All entity CRUD and every lifecycle transition goes through here.
/// Transition guards re-read the current persisted state under the
/// connection lock before mutating, so a caller holding a stale view of
/// a project observes an invalid-transition failure instead of silently
/// clobbering a concurrent admin's decision.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "clubhouse")
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("clubhouse.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        schema::run_migrations(&conn).map_err(Error::Internal)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database lock poisoned")
    }

    // ============================================================
    // Member operations
    // ============================================================

    pub fn get_all_members(&self) -> Result<Vec<Member>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY name"
        ))?;

        let members = stmt
            .query_map([], member_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(members)
    }

    pub fn get_member(&self, id: Uuid) -> Result<Option<Member>> {
        let conn = self.lock();
        load_member(&conn, id)
    }

    pub fn create_member(&self, input: CreateMemberInput) -> Result<Member> {
        if input.name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        if input.email.trim().is_empty() {
            return Err(Error::validation("email must not be empty"));
        }

        let conn = self.lock();
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO members (id, name, email, points, role, committee, memo_tokens, is_admin, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?, 0, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.email,
                input.role.as_str(),
                input.committee.as_str(),
                input.is_admin as i32,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| constraint_to_validation(e, "email is already registered"))?;

        Ok(Member {
            id,
            name: input.name,
            email: input.email,
            points: 0,
            role: input.role,
            committee: input.committee,
            memo_tokens: 0,
            is_admin: input.is_admin,
            created_at: now,
            updated_at: now,
        })
    }

    /// Partial update. `points` here is the admin override, the one place
    /// a point total is allowed to move in either direction.
    pub fn update_member(&self, id: Uuid, input: UpdateMemberInput) -> Result<Member> {
        let conn = self.lock();
        let existing = load_member(&conn, id)?.ok_or(Error::NotFound("member"))?;

        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let email = input.email.unwrap_or(existing.email);
        let points = input.points.unwrap_or(existing.points);
        let role = input.role.unwrap_or(existing.role);
        let committee = input.committee.unwrap_or(existing.committee);
        let memo_tokens = input.memo_tokens.unwrap_or(existing.memo_tokens);
        let is_admin = input.is_admin.unwrap_or(existing.is_admin);

        if name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }

        conn.execute(
            "UPDATE members SET name = ?, email = ?, points = ?, role = ?, committee = ?, memo_tokens = ?, is_admin = ?, updated_at = ? WHERE id = ?",
            (
                &name,
                &email,
                points,
                role.as_str(),
                committee.as_str(),
                memo_tokens,
                is_admin as i32,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )
        .map_err(|e| constraint_to_validation(e, "email is already registered"))?;

        Ok(Member {
            id,
            name,
            email,
            points,
            role,
            committee,
            memo_tokens,
            is_admin,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    pub fn delete_member(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM members WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Members ordered by points descending, each with their derived rank.
    pub fn leaderboard(&self) -> Result<Vec<MemberWithRank>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY points DESC, name"
        ))?;

        let members = stmt
            .query_map([], member_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(members.into_iter().map(MemberWithRank::from).collect())
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
        ))?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.lock();
        load_project(&conn, id)
    }

    pub fn get_project_with_members(&self, id: Uuid) -> Result<Option<ProjectWithMembers>> {
        let conn = self.lock();
        let Some(project) = load_project(&conn, id)? else {
            return Ok(None);
        };
        let members = load_project_members(&conn, id)?;
        Ok(Some(ProjectWithMembers { project, members }))
    }

    /// Create a project in `Pending` on behalf of its author.
    pub fn submit_project(&self, author_id: Uuid, input: SubmitProjectInput) -> Result<Project> {
        input.validate()?;

        let conn = self.lock();
        load_member(&conn, author_id)?.ok_or(Error::NotFound("member"))?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, author_id, title, description, committee, required_members, timeframe, repo_link, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
            (
                id.to_string(),
                author_id.to_string(),
                &input.title,
                &input.description,
                input.committee.as_str(),
                input.required_members,
                input.timeframe.to_string(),
                &input.repo_link,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            author_id,
            title: input.title,
            description: input.description,
            committee: input.committee,
            required_members: input.required_members,
            timeframe: input.timeframe,
            repo_link: input.repo_link,
            status: ProjectStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approve a pending project, assigning the point value it will pay out.
    pub fn approve_project(&self, id: Uuid, points: u32) -> Result<Project> {
        let conn = self.lock();
        let mut project = load_project(&conn, id)?.ok_or(Error::NotFound("project"))?;

        project.status = project.status.approve(points)?;
        write_status(&conn, &mut project)?;

        Ok(project)
    }

    /// Reject a pending project with an optional reason. Terminal.
    pub fn reject_project(&self, id: Uuid, reason: Option<String>) -> Result<Project> {
        let conn = self.lock();
        let mut project = load_project(&conn, id)?.ok_or(Error::NotFound("project"))?;

        project.status = project.status.reject(reason)?;
        write_status(&conn, &mut project)?;

        Ok(project)
    }

    /// Complete an approved project and credit its point value to every
    /// joined member. Status change and credits commit atomically.
    pub fn complete_project(&self, id: Uuid) -> Result<Project> {
        let conn = self.lock();
        let mut project = load_project(&conn, id)?.ok_or(Error::NotFound("project"))?;

        project.status = project.status.complete()?;
        let points = project.status.points().unwrap_or(0);
        let now = Utc::now();
        project.updated_at = now;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE projects SET status = ?, points = ?, updated_at = ? WHERE id = ?",
            (
                project.status.as_str(),
                points,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;
        tx.execute(
            "UPDATE members SET points = points + ?, updated_at = ?
             WHERE id IN (SELECT member_id FROM project_members WHERE project_id = ?)",
            (points, now.to_rfc3339(), id.to_string()),
        )?;
        tx.commit()?;

        Ok(project)
    }

    /// Partial edit of an approved project.
    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Project> {
        let conn = self.lock();
        let mut project = load_project(&conn, id)?.ok_or(Error::NotFound("project"))?;

        if !project.status.editable() {
            return Err(project.status.transition_error("update"));
        }

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(Error::validation("title must not be empty"));
            }
            project.title = title;
        }
        if let Some(description) = input.description {
            if description.trim().is_empty() {
                return Err(Error::validation("description must not be empty"));
            }
            project.description = description;
        }
        if let Some(points) = input.points {
            // editable() already restricted us to Approved
            project.status = ProjectStatus::Approved { points };
        }
        if let Some(required) = input.required_members {
            let joined = load_project_members(&conn, id)?.len() as u32;
            if required < 1 {
                return Err(Error::validation("a project needs at least one member"));
            }
            if required < joined {
                return Err(Error::validation(format!(
                    "{} members already joined; required count cannot drop below that",
                    joined
                )));
            }
            project.required_members = required;
        }
        if let Some(timeframe) = input.timeframe {
            project.timeframe = timeframe;
        }
        if let Some(repo_link) = input.repo_link {
            project.repo_link = Some(repo_link);
        }

        let now = Utc::now();
        project.updated_at = now;

        conn.execute(
            "UPDATE projects SET title = ?, description = ?, required_members = ?, timeframe = ?, repo_link = ?, status = ?, points = ?, updated_at = ? WHERE id = ?",
            (
                &project.title,
                &project.description,
                project.required_members,
                project.timeframe.to_string(),
                &project.repo_link,
                project.status.as_str(),
                project.status.points(),
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(project)
    }

    /// Add a member to a project's joined set, respecting capacity.
    pub fn join_project(&self, id: Uuid, member_id: Uuid) -> Result<ProjectWithMembers> {
        let conn = self.lock();
        let project = load_project(&conn, id)?.ok_or(Error::NotFound("project"))?;
        load_member(&conn, member_id)?.ok_or(Error::NotFound("member"))?;

        if !project.status.joinable() {
            return Err(project.status.transition_error("join"));
        }

        let joined = load_project_members(&conn, id)?;
        if joined.len() as u32 >= project.required_members {
            return Err(Error::validation("project already has all its members"));
        }

        conn.execute(
            "INSERT INTO project_members (project_id, member_id, joined_at) VALUES (?, ?, ?)",
            (
                id.to_string(),
                member_id.to_string(),
                Utc::now().to_rfc3339(),
            ),
        )
        .map_err(|e| constraint_to_validation(e, "member already joined this project"))?;

        let members = load_project_members(&conn, id)?;
        Ok(ProjectWithMembers { project, members })
    }

    /// Delete a project. Completed projects back awarded points and stay.
    pub fn delete_project(&self, id: Uuid) -> Result<()> {
        let conn = self.lock();
        let project = load_project(&conn, id)?.ok_or(Error::NotFound("project"))?;

        if !project.status.deletable() {
            return Err(project.status.transition_error("delete"));
        }

        conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(())
    }

    // ============================================================
    // Poll operations
    // ============================================================

    pub fn get_all_polls(&self, viewer: Option<Uuid>) -> Result<Vec<PollView>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id FROM polls ORDER BY created_at DESC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            let id = parse_uuid(id);
            if let Some(view) = load_poll_view(&conn, id, viewer)? {
                views.push(view);
            }
        }
        Ok(views)
    }

    pub fn get_poll(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<PollView>> {
        let conn = self.lock();
        load_poll_view(&conn, id, viewer)
    }

    pub fn create_poll(&self, author_id: Uuid, input: CreatePollInput) -> Result<Poll> {
        input.validate()?;

        let conn = self.lock();
        load_member(&conn, author_id)?.ok_or(Error::NotFound("member"))?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO polls (id, question, author_id, status, expires_at, created_at)
             VALUES (?, ?, ?, 'active', ?, ?)",
            (
                id.to_string(),
                &input.question,
                author_id.to_string(),
                input.expires_at.map(|at| at.to_rfc3339()),
                now.to_rfc3339(),
            ),
        )?;
        for (index, label) in input.options.iter().enumerate() {
            tx.execute(
                "INSERT INTO poll_options (poll_id, idx, label, votes) VALUES (?, ?, ?, 0)",
                (id.to_string(), index as u32, label),
            )?;
        }
        tx.commit()?;

        let options = input
            .options
            .into_iter()
            .enumerate()
            .map(|(index, label)| PollOption {
                index: index as u32,
                label,
                votes: 0,
            })
            .collect();

        Ok(Poll {
            id,
            question: input.question,
            author_id,
            options,
            status: PollStatus::Active,
            expires_at: input.expires_at,
            created_at: now,
        })
    }

    /// Cast a vote. At most one vote per member per poll; counters only
    /// ever increase. The insert and the counter bump commit together.
    pub fn vote(&self, poll_id: Uuid, member_id: Uuid, option: u32) -> Result<PollView> {
        let conn = self.lock();
        let poll = load_poll(&conn, poll_id)?.ok_or(Error::NotFound("poll"))?;
        load_member(&conn, member_id)?.ok_or(Error::NotFound("member"))?;

        let now = Utc::now();
        if !poll.open_for_votes(now) {
            return Err(Error::InvalidTransition {
                entity: "poll",
                action: "vote on",
                state: poll.blocked_state(now),
            });
        }
        if !poll.options.iter().any(|o| o.index == option) {
            return Err(Error::validation("no such poll option"));
        }

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO poll_votes (poll_id, member_id, option_idx, created_at) VALUES (?, ?, ?, ?)",
            (
                poll_id.to_string(),
                member_id.to_string(),
                option,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| constraint_to_validation(e, "member already voted on this poll"))?;
        tx.execute(
            "UPDATE poll_options SET votes = votes + 1 WHERE poll_id = ? AND idx = ?",
            (poll_id.to_string(), option),
        )?;
        tx.commit()?;

        load_poll_view(&conn, poll_id, Some(member_id))?.ok_or(Error::NotFound("poll"))
    }

    /// Close an active poll. Closing twice is an invalid transition.
    pub fn close_poll(&self, id: Uuid) -> Result<Poll> {
        let conn = self.lock();
        let mut poll = load_poll(&conn, id)?.ok_or(Error::NotFound("poll"))?;

        if poll.status == PollStatus::Closed {
            return Err(Error::InvalidTransition {
                entity: "poll",
                action: "close",
                state: "closed",
            });
        }

        conn.execute(
            "UPDATE polls SET status = 'closed' WHERE id = ?",
            [id.to_string()],
        )?;
        poll.status = PollStatus::Closed;
        Ok(poll)
    }

    pub fn delete_poll(&self, id: Uuid) -> Result<()> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM polls WHERE id = ?", [id.to_string()])?;
        if rows == 0 {
            return Err(Error::NotFound("poll"));
        }
        Ok(())
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Row mapping
// ============================================================

const MEMBER_COLUMNS: &str =
    "id, name, email, points, role, committee, memo_tokens, is_admin, created_at, updated_at";

const PROJECT_COLUMNS: &str =
    "id, author_id, title, description, committee, required_members, timeframe, repo_link, status, points, rejection_reason, created_at, updated_at";

fn member_from_row(row: &Row) -> rusqlite::Result<Member> {
    Ok(Member {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        points: row.get(3)?,
        role: Role::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        committee: Committee::from_str(&row.get::<_, String>(5)?).unwrap_or_default(),
        memo_tokens: row.get(6)?,
        is_admin: row.get::<_, i32>(7)? != 0,
        created_at: parse_datetime(row.get::<_, String>(8)?),
        updated_at: parse_datetime(row.get::<_, String>(9)?),
    })
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        author_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        committee: Committee::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        required_members: row.get(5)?,
        timeframe: parse_date(row.get::<_, String>(6)?),
        repo_link: row.get(7)?,
        status: ProjectStatus::decode(
            &row.get::<_, String>(8)?,
            row.get::<_, Option<u32>>(9)?,
            row.get::<_, Option<String>>(10)?,
        ),
        created_at: parse_datetime(row.get::<_, String>(11)?),
        updated_at: parse_datetime(row.get::<_, String>(12)?),
    })
}

fn load_member(conn: &Connection, id: Uuid) -> Result<Option<Member>> {
    let mut stmt = conn.prepare(&format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?"))?;
    Ok(stmt
        .query_row([id.to_string()], member_from_row)
        .optional()?)
}

fn load_project(conn: &Connection, id: Uuid) -> Result<Option<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
    ))?;
    Ok(stmt
        .query_row([id.to_string()], project_from_row)
        .optional()?)
}

fn load_project_members(conn: &Connection, project_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT member_id FROM project_members WHERE project_id = ? ORDER BY joined_at",
    )?;
    let members = stmt
        .query_map([project_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(members.into_iter().map(parse_uuid).collect())
}

fn load_poll(conn: &Connection, id: Uuid) -> Result<Option<Poll>> {
    let mut stmt = conn.prepare(
        "SELECT id, question, author_id, status, expires_at, created_at FROM polls WHERE id = ?",
    )?;
    let poll = stmt
        .query_row([id.to_string()], |row| {
            Ok(Poll {
                id: parse_uuid(row.get::<_, String>(0)?),
                question: row.get(1)?,
                author_id: parse_uuid(row.get::<_, String>(2)?),
                options: Vec::new(),
                status: PollStatus::from_str(&row.get::<_, String>(3)?)
                    .unwrap_or(PollStatus::Active),
                expires_at: row.get::<_, Option<String>>(4)?.map(parse_datetime),
                created_at: parse_datetime(row.get::<_, String>(5)?),
            })
        })
        .optional()?;

    let Some(mut poll) = poll else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT idx, label, votes FROM poll_options WHERE poll_id = ? ORDER BY idx")?;
    poll.options = stmt
        .query_map([id.to_string()], |row| {
            Ok(PollOption {
                index: row.get(0)?,
                label: row.get(1)?,
                votes: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(poll))
}

fn load_poll_view(conn: &Connection, id: Uuid, viewer: Option<Uuid>) -> Result<Option<PollView>> {
    let Some(poll) = load_poll(conn, id)? else {
        return Ok(None);
    };

    let voted_option = match viewer {
        Some(member_id) => conn
            .query_row(
                "SELECT option_idx FROM poll_votes WHERE poll_id = ? AND member_id = ?",
                (id.to_string(), member_id.to_string()),
                |row| row.get::<_, u32>(0),
            )
            .optional()?,
        None => None,
    };

    Ok(Some(PollView {
        has_voted: voted_option.is_some(),
        voted_option,
        poll,
    }))
}

/// Persist a project's status columns after a transition.
fn write_status(conn: &Connection, project: &mut Project) -> Result<()> {
    let now = Utc::now();
    project.updated_at = now;

    let reason = match &project.status {
        ProjectStatus::Rejected { reason } => reason.clone(),
        _ => None,
    };

    conn.execute(
        "UPDATE projects SET status = ?, points = ?, rejection_reason = ?, updated_at = ? WHERE id = ?",
        (
            project.status.as_str(),
            project.status.points(),
            reason,
            now.to_rfc3339(),
            project.id.to_string(),
        ),
    )?;
    Ok(())
}

/// Map a UNIQUE/CHECK violation to a caller-facing validation failure;
/// anything else stays internal.
fn constraint_to_validation(e: rusqlite::Error, message: &str) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::validation(message)
        }
        _ => e.into(),
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> NaiveDate {
    s.parse().unwrap_or_default()
}
