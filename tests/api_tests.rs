mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestApp, TestUser};

fn custom_statuses() -> Value {
    json!([
        { "name": "To Do", "type": "To_Do", "color": "#90a9d0" },
        { "name": "Doing", "type": "In_Progress", "color": "#f9d171" },
        { "name": "Bug", "type": "In_Progress", "color": "#dc2626" },
        { "name": "Done", "type": "Completed", "color": "#008844" },
    ])
}

fn id_of(statuses: &[(String, String)], name: &str) -> String {
    statuses
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, id)| id.clone())
        .unwrap_or_else(|| panic!("no status named {name}"))
}

/// Owner, workspace, a project with the four custom statuses and one sprint.
struct Fixture {
    owner: TestUser,
    workspace: Value,
    project_id: String,
    sprint_id: String,
    statuses: Vec<(String, String)>,
}

async fn fixture(app: &TestApp) -> Fixture {
    let owner = app.user("owner").await;
    let workspace = app.create_workspace(&owner, "Acme").await;
    let workspace_id = workspace["id"].as_str().unwrap();
    let project = app
        .create_project(&owner.token, workspace_id, "Launch", Some(custom_statuses()))
        .await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let sprint = app.create_sprint(&owner.token, &project_id, "Sprint 1").await;
    let sprint_id = sprint["id"].as_str().unwrap().to_string();
    let statuses = app.status_ids(&owner.token, &project_id).await;
    Fixture {
        owner,
        workspace,
        project_id,
        sprint_id,
        statuses,
    }
}

impl Fixture {
    fn workspace_id(&self) -> &str {
        self.workspace["id"].as_str().unwrap()
    }

    async fn task_in(&self, app: &TestApp, status: &str, name: &str) -> String {
        let task = app
            .create_task(
                &self.owner.token,
                &self.sprint_id,
                &json!({ "name": name, "statusId": id_of(&self.statuses, status) }),
            )
            .await;
        task["id"].as_str().unwrap().to_string()
    }

    /// `user` joins the workspace and is added to the project.
    async fn add_member(&self, app: &TestApp, user: &TestUser) {
        assert_eq!(app.join(user, &self.workspace).await, StatusCode::CREATED);
        let (body, status) = app
            .post_auth(
                &format!("/api/v1/projects/{}/members", self.project_id),
                &self.owner.token,
                &json!({ "userIds": [user.id] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add member failed: {body}");
    }
}

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

// ── Registration & Auth ─────────────────────────────────────────

#[tokio::test]
async fn register_and_login() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("alice", "alice@test.com", "password123").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["access_token"].is_string());
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("passwordHash").is_none());

    let (body, status) = app.login("ALICE@test.com", "password123").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["access_token"].as_str().unwrap();

    let (me, status) = app.get_auth("/api/v1/users/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "alice@test.com");

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_duplicates_and_short_passwords() {
    let app = common::spawn_app().await;
    app.user("alice").await;

    let (_, status) = app.register("alice", "other@test.com", "password123").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status) = app.register("bob", "bob@test.com", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_email_differing_only_in_case() {
    let app = common::spawn_app().await;

    let (_, status) = app.register("bob", "Bob@x.test", "password-one").await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, status) = app.register("bobby", "bob@x.test", "password-two").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status) = app.login("bob@x.test", "password-one").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_invalid_credentials() {
    let app = common::spawn_app().await;
    app.user("alice").await;

    let (_, status) = app.login("alice@test.com", "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.login("nobody@test.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn unauthenticated_requests_rejected() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/workspaces"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, status) = app.get_auth("/api/v1/users/me", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

// ── Profile ─────────────────────────────────────────────────────

#[tokio::test]
async fn profile_update_accepts_multipart_image() {
    let app = common::spawn_app().await;
    let alice = app.user("alice").await;

    let form = reqwest::multipart::Form::new()
        .text("username", "alice2")
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4e, 0x47]).file_name("me.png"),
        );
    let resp = app
        .client
        .put(app.url("/api/v1/users/me"))
        .bearer_auth(&alice.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "alice2");
    assert_eq!(body["image"], "https://images.test/me.png");

    common::cleanup(app).await;
}

// ── Workspaces ──────────────────────────────────────────────────

#[tokio::test]
async fn joining_twice_is_rejected() {
    let app = common::spawn_app().await;
    let owner = app.user("owner").await;
    let bob = app.user("bob").await;
    let workspace = app.create_workspace(&owner, "Acme").await;
    assert_eq!(workspace["inviteCode"].as_str().unwrap().len(), 7);

    assert_eq!(app.join(&bob, &workspace).await, StatusCode::CREATED);
    assert_eq!(app.join(&bob, &workspace).await, StatusCode::CONFLICT);

    let rows = app
        .count(&format!(
            "SELECT COUNT(*) FROM workspace_members
             WHERE workspace_id = '{}' AND user_id = '{}'",
            workspace["id"].as_str().unwrap(),
            bob.id
        ))
        .await;
    assert_eq!(rows, 1);

    let (_, status) = app
        .post_auth(
            "/api/v1/workspaces/join",
            &bob.token,
            &json!({ "inviteCode": "nope123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn workspace_role_gates() {
    let app = common::spawn_app().await;
    let owner = app.user("owner").await;
    let admin = app.user("admin").await;
    let member = app.user("member").await;
    let outsider = app.user("outsider").await;
    let workspace = app.create_workspace(&owner, "Acme").await;
    let id = workspace["id"].as_str().unwrap();
    app.join(&admin, &workspace).await;
    app.join(&member, &workspace).await;

    let (_, status) = app
        .put_auth(
            &format!("/api/v1/workspaces/{id}/members/{}", admin.id),
            &owner.token,
            &json!({ "role": "Admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Unknown role
    let (_, status) = app
        .put_auth(
            &format!("/api/v1/workspaces/{id}/members/{}", member.id),
            &owner.token,
            &json!({ "role": "Boss" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Admins cannot hand out ownership
    let (_, status) = app
        .put_auth(
            &format!("/api/v1/workspaces/{id}/members/{}", member.id),
            &admin.token,
            &json!({ "role": "Owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Members cannot rename or delete
    let (_, status) = app
        .put_auth(
            &format!("/api/v1/workspaces/{id}"),
            &member.token,
            &json!({ "name": "Mine" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app
        .delete_auth(&format!("/api/v1/workspaces/{id}"), &admin.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Non-members do not learn the workspace exists
    let (_, status) = app
        .get_auth(&format!("/api/v1/workspaces/{id}/analytics"), &outsider.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (body, status) = app
        .put_auth(
            &format!("/api/v1/workspaces/{id}"),
            &owner.token,
            &json!({ "name": "Acme Corp" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Corp");

    common::cleanup(app).await;
}

#[tokio::test]
async fn leaving_only_removes_the_caller() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    let carol = app.user("carol").await;
    fx.add_member(&app, &bob).await;
    fx.add_member(&app, &carol).await;

    let task_id = fx.task_in(&app, "To Do", "Shared").await;
    let (_, status) = app
        .put_auth(
            &format!("/api/v1/tasks/{task_id}/assignees"),
            &fx.owner.token,
            &json!({ "userIds": [bob.id, carol.id] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/workspaces/{}/leave", fx.workspace_id()),
            &bob.token,
            &json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (task, _) = app
        .get_auth(&format!("/api/v1/tasks/{task_id}"), &fx.owner.token)
        .await;
    let assignees: Vec<&str> = task["assignees"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["username"].as_str().unwrap())
        .collect();
    assert_eq!(assignees, vec!["carol"]);

    let (members, _) = app
        .get_auth(&format!("/api/v1/projects/{}/members", fx.project_id), &fx.owner.token)
        .await;
    assert_eq!(members["currentMembers"].as_array().unwrap().len(), 2);

    // The only owner has to hand over first
    let (_, status) = app
        .post_auth(
            &format!("/api/v1/workspaces/{}/leave", fx.workspace_id()),
            &fx.owner.token,
            &json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn invites_report_partial_delivery() {
    let app = common::spawn_app().await;
    let owner = app.user("owner").await;
    let workspace = app.create_workspace(&owner, "Acme").await;
    let id = workspace["id"].as_str().unwrap();

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/workspaces/{id}/invites"),
            &owner.token,
            &json!({ "emails": ["a@ok.test", "b@bounce.test"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["sent"], json!(["a@ok.test"]));
    assert_eq!(body["failed"], json!(["b@bounce.test"]));

    let sent = app.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains(workspace["inviteCode"].as_str().unwrap()));

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/workspaces/{id}/invites"),
            &owner.token,
            &json!({ "emails": ["c@bounce.test"] }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/workspaces/{id}/invites"),
            &owner.token,
            &json!({ "emails": ["not-an-email"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn workspace_analytics_counts() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    app.create_sprint(&fx.owner.token, &fx.project_id, "Sprint 2").await;

    let (body, status) = app
        .get_auth(
            &format!("/api/v1/workspaces/{}/analytics", fx.workspace_id()),
            &fx.owner.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"], 1);
    assert_eq!(body["members"], 1);
    assert_eq!(body["sprints"], 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn workspace_analytics_counts_past_due_projects() {
    let app = common::spawn_app().await;
    let owner = app.user("owner").await;
    let workspace = app.create_workspace(&owner, "Acme").await;
    let path = format!("/api/v1/workspaces/{}/projects", workspace["id"].as_str().unwrap());

    for (name, start, due) in [
        ("Late", "2020-01-01T00:00:00Z", "2020-06-30T00:00:00Z"),
        ("Future", "2020-01-01T00:00:00Z", "2099-12-31T00:00:00Z"),
    ] {
        let (body, status) = app
            .post_auth(
                &path,
                &owner.token,
                &json!({ "name": name, "startDate": start, "dueDate": due }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (body, status) = app
        .get_auth(
            &format!("/api/v1/workspaces/{}/analytics", workspace["id"].as_str().unwrap()),
            &owner.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"], 2);
    assert_eq!(body["overdueProjects"], 1);

    common::cleanup(app).await;
}

// ── Projects & boards ───────────────────────────────────────────

#[tokio::test]
async fn default_statuses_created_with_project() {
    let app = common::spawn_app().await;
    let owner = app.user("owner").await;
    let workspace = app.create_workspace(&owner, "Acme").await;
    let project = app
        .create_project(&owner.token, workspace["id"].as_str().unwrap(), "Launch", None)
        .await;

    let statuses = app
        .status_ids(&owner.token, project["id"].as_str().unwrap())
        .await;
    let names: Vec<&str> = statuses.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["To Do", "In Progress", "Bug", "Completed"]);

    let (projects, _) = app
        .get_auth(
            &format!("/api/v1/workspaces/{}/projects", workspace["id"].as_str().unwrap()),
            &owner.token,
        )
        .await;
    assert_eq!(projects[0]["role"], "Project_Manager");
    assert_eq!(projects[0]["members"], 1);
    assert_eq!(projects[0]["sprintCount"], 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn project_rejects_inverted_dates() {
    let app = common::spawn_app().await;
    let owner = app.user("owner").await;
    let workspace = app.create_workspace(&owner, "Acme").await;

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/workspaces/{}/projects", workspace["id"].as_str().unwrap()),
            &owner.token,
            &json!({
                "name": "Backwards",
                "startDate": "2026-12-31T00:00:00Z",
                "dueDate": "2026-01-01T00:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count("SELECT COUNT(*) FROM projects").await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn counts_group_statuses_by_type() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    fx.task_in(&app, "To Do", "a").await;
    fx.task_in(&app, "To Do", "b").await;
    fx.task_in(&app, "Doing", "c").await;
    fx.task_in(&app, "Bug", "d").await;
    fx.task_in(&app, "Done", "e").await;

    let (body, status) = app
        .get_auth(&format!("/api/v1/projects/{}", fx.project_id), &fx.owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let overview = &body["project"];
    assert_eq!(overview["toDo"], 2);
    assert_eq!(overview["inProgress"], 2);
    assert_eq!(overview["completed"], 1);
    assert_eq!(overview["tasks"], 5);
    assert_eq!(overview["mediumPriority"], 5);
    assert_eq!(overview["members"], 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn sprint_board_lists_every_status_in_board_order() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    fx.task_in(&app, "Doing", "only").await;

    let (body, status) = app
        .get_auth(&format!("/api/v1/sprints/{}", fx.sprint_id), &fx.owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let columns = body["taskStatus"].as_array().unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Done", "Doing", "Bug", "To Do"]);

    let sizes: Vec<usize> = columns
        .iter()
        .map(|c| c["tasks"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![0, 1, 0, 0]);
    assert_eq!(columns[1]["tasks"][0]["assignees"], json!([]));
    assert_eq!(columns[1]["tasks"][0]["bugCount"], 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn status_edit_refuses_to_drop_used_status() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    fx.task_in(&app, "Bug", "broken").await;
    let path = format!("/api/v1/projects/{}/statuses", fx.project_id);

    let (_, status) = app
        .put_auth(
            &path,
            &fx.owner.token,
            &json!({ "statuses": [{ "id": id_of(&fx.statuses, "Bug") }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (body, status) = app
        .put_auth(
            &path,
            &fx.owner.token,
            &json!({ "statuses": [
                { "id": id_of(&fx.statuses, "Doing"), "name": "Working", "type": "In_Progress", "color": "#123456" },
                { "name": "Review", "type": "In_Progress", "color": "#abcdef" },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["To Do", "Working", "Bug", "Review", "Done"]);

    common::cleanup(app).await;
}

#[tokio::test]
async fn only_managers_change_projects() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    fx.add_member(&app, &bob).await;

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/projects/{}/sprints", fx.project_id),
            &bob.token,
            &json!({
                "name": "Rogue",
                "startDate": "2026-03-01T00:00:00Z",
                "endDate": "2026-03-14T00:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app
        .delete_auth(&format!("/api/v1/projects/{}", fx.project_id), &bob.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Members still create tasks
    let task = app
        .create_task(&bob.token, &fx.sprint_id, &json!({ "name": "From bob" }))
        .await;
    assert_eq!(task["statusId"], id_of(&fx.statuses, "To Do"));

    common::cleanup(app).await;
}

// ── Tasks ───────────────────────────────────────────────────────

#[tokio::test]
async fn task_status_must_belong_to_the_project() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let other = app
        .create_project(&fx.owner.token, fx.workspace_id(), "Other", None)
        .await;
    let foreign = app
        .status_ids(&fx.owner.token, other["id"].as_str().unwrap())
        .await;

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/sprints/{}/tasks", fx.sprint_id),
            &fx.owner.token,
            &json!({ "name": "Lost", "statusId": foreign[0].1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let task_id = fx.task_in(&app, "To Do", "Found").await;
    let (_, status) = app
        .put_auth(
            &format!("/api/v1/tasks/{task_id}"),
            &fx.owner.token,
            &json!({ "statusId": foreign[0].1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn task_update_tracks_bugs() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let task_id = fx.task_in(&app, "Bug", "Flaky").await;
    let path = format!("/api/v1/tasks/{task_id}");

    let (body, status) = app
        .put_auth(
            &path,
            &fx.owner.token,
            &json!({ "frontendBugCount": 1, "backendBugCount": 2, "databaseBugCount": 3, "priority": "High" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["bugCount"], 6);
    assert_eq!(body["priority"], "High");
    assert_eq!(body["name"], "Flaky");

    let (_, status) = app
        .put_auth(&path, &fx.owner.token, &json!({ "backendBugCount": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .put_auth(&path, &fx.owner.token, &json!({ "priority": "Urgent" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn assignees_must_be_project_members() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let stranger = app.user("stranger").await;
    let task_id = fx.task_in(&app, "To Do", "Solo").await;

    let (_, status) = app
        .put_auth(
            &format!("/api/v1/tasks/{task_id}/assignees"),
            &fx.owner.token,
            &json!({ "userIds": [stranger.id] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count("SELECT COUNT(*) FROM task_assignments").await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn user_analytics_scoped_to_project() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    fx.add_member(&app, &bob).await;

    for (status, name) in [("To Do", "a"), ("Done", "b"), ("Bug", "c")] {
        let task_id = fx.task_in(&app, status, name).await;
        app.put_auth(
            &format!("/api/v1/tasks/{task_id}/assignees"),
            &fx.owner.token,
            &json!({ "userIds": [bob.id] }),
        )
        .await;
        app.put_auth(
            &format!("/api/v1/tasks/{task_id}"),
            &fx.owner.token,
            &json!({ "frontendBugCount": 1 }),
        )
        .await;
    }
    fx.task_in(&app, "To Do", "unassigned").await;

    let (body, status) = app
        .get_auth(
            &format!("/api/v1/projects/{}/users/{}/analytics", fx.project_id, bob.id),
            &fx.owner.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let details = &body["details"];
    assert_eq!(details["role"], "Member");
    assert_eq!(details["sprintCount"], 1);
    assert_eq!(details["idealTaskCount"], 10);
    assert_eq!(details["tasks"]["total"], 3);
    assert_eq!(details["tasks"]["todo"], 1);
    assert_eq!(details["tasks"]["inProgress"], 1);
    assert_eq!(details["tasks"]["completed"], 1);
    assert_eq!(details["tasks"]["bugs"], 3);

    let other_sprint = app.create_sprint(&fx.owner.token, &fx.project_id, "Sprint 2").await;
    let (body, _) = app
        .get_auth(
            &format!(
                "/api/v1/projects/{}/users/{}/analytics?sprint_id={}",
                fx.project_id,
                bob.id,
                other_sprint["id"].as_str().unwrap()
            ),
            &fx.owner.token,
        )
        .await;
    assert_eq!(body["details"]["tasks"]["total"], 0);
    assert_eq!(body["details"]["tasks"]["bugs"], 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn comments_and_feedback() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let task_id = fx.task_in(&app, "To Do", "Discuss").await;

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/tasks/{task_id}/comments"),
            &fx.owner.token,
            &json!({ "body": "Looks good" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (comments, _) = app
        .get_auth(&format!("/api/v1/tasks/{task_id}/comments"), &fx.owner.token)
        .await;
    assert_eq!(comments[0]["authorName"], "owner");

    let feedback_path = format!("/api/v1/sprints/{}/feedback", fx.sprint_id);
    let (_, status) = app
        .post_auth(
            &feedback_path,
            &fx.owner.token,
            &json!({ "feedback": { "wentWell": "shipping", "toImprove": "estimates" } }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, status) = app
        .post_auth(&feedback_path, &fx.owner.token, &json!({ "feedback": "text" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (entries, _) = app.get_auth(&feedback_path, &fx.owner.token).await;
    assert_eq!(entries[0]["feedback"]["wentWell"], "shipping");

    let (retros, _) = app
        .get_auth(
            &format!("/api/v1/workspaces/{}/retrospectives", fx.workspace_id()),
            &fx.owner.token,
        )
        .await;
    assert_eq!(retros[0]["projectName"], "Launch");
    assert_eq!(retros[0]["sprints"][0]["name"], "Sprint 1");

    common::cleanup(app).await;
}

#[tokio::test]
async fn retrospectives_include_projects_without_sprints() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    app.create_project(&fx.owner.token, fx.workspace_id(), "Fresh", None)
        .await;

    let (retros, status) = app
        .get_auth(
            &format!("/api/v1/workspaces/{}/retrospectives", fx.workspace_id()),
            &fx.owner.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let retros = retros.as_array().unwrap();
    assert_eq!(retros.len(), 2);
    assert_eq!(retros[0]["projectName"], "Launch");
    assert_eq!(retros[0]["sprints"].as_array().unwrap().len(), 1);
    assert_eq!(retros[1]["projectName"], "Fresh");
    assert_eq!(retros[1]["role"], "Project_Manager");
    assert_eq!(retros[1]["sprints"], json!([]));

    common::cleanup(app).await;
}

// ── Cascading deletes ───────────────────────────────────────────

#[tokio::test]
async fn project_delete_leaves_no_dependents() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    fx.add_member(&app, &bob).await;
    let task_id = fx.task_in(&app, "Doing", "Doomed").await;
    app.put_auth(
        &format!("/api/v1/tasks/{task_id}/assignees"),
        &fx.owner.token,
        &json!({ "userIds": [bob.id] }),
    )
    .await;
    app.post_auth(
        &format!("/api/v1/tasks/{task_id}/comments"),
        &bob.token,
        &json!({ "body": "bye" }),
    )
    .await;
    app.post_auth(
        &format!("/api/v1/sprints/{}/feedback", fx.sprint_id),
        &bob.token,
        &json!({ "feedback": { "note": "fine" } }),
    )
    .await;

    let (_, status) = app
        .delete_auth(&format!("/api/v1/projects/{}", fx.project_id), &fx.owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    for table in [
        "projects",
        "project_members",
        "statuses",
        "sprints",
        "sprint_feedback",
        "tasks",
        "task_assignments",
        "task_comments",
    ] {
        assert_eq!(
            app.count(&format!("SELECT COUNT(*) FROM {table}")).await,
            0,
            "{table} not empty"
        );
    }
    assert_eq!(app.count("SELECT COUNT(*) FROM workspace_members").await, 2);

    let (_, status) = app
        .get_auth(&format!("/api/v1/projects/{}", fx.project_id), &fx.owner.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn failed_project_delete_rolls_back() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    fx.task_in(&app, "To Do", "survivor").await;

    sqlx::query(
        "CREATE FUNCTION refuse_delete() RETURNS trigger AS $$
         BEGIN RAISE EXCEPTION 'refused'; END;
         $$ LANGUAGE plpgsql",
    )
    .execute(&app.pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER refuse_sprint_delete BEFORE DELETE ON sprints
         FOR EACH ROW EXECUTE FUNCTION refuse_delete()",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let (body, status) = app
        .delete_auth(&format!("/api/v1/projects/{}", fx.project_id), &fx.owner.token)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");

    assert_eq!(app.count("SELECT COUNT(*) FROM tasks").await, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM projects").await, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM statuses").await, 4);

    common::cleanup(app).await;
}

#[tokio::test]
async fn workspace_delete_removes_every_project() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let second = app.create_sprint(&fx.owner.token, &fx.project_id, "Sprint 2").await;
    fx.task_in(&app, "To Do", "one").await;
    app.create_task(
        &fx.owner.token,
        second["id"].as_str().unwrap(),
        &json!({ "name": "two" }),
    )
    .await;

    let (_, status) = app
        .delete_auth(&format!("/api/v1/workspaces/{}", fx.workspace_id()), &fx.owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.count("SELECT COUNT(*) FROM tasks").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM sprints").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM projects").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM workspace_members").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM workspaces").await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn account_delete_keeps_tasks() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    fx.add_member(&app, &bob).await;
    let task_id = fx.task_in(&app, "To Do", "Kept").await;
    app.put_auth(
        &format!("/api/v1/tasks/{task_id}/assignees"),
        &fx.owner.token,
        &json!({ "userIds": [bob.id] }),
    )
    .await;
    app.post_auth(
        &format!("/api/v1/tasks/{task_id}/comments"),
        &bob.token,
        &json!({ "body": "mine" }),
    )
    .await;

    let (_, status) = app.delete_auth("/api/v1/users/me", &bob.token).await;
    assert_eq!(status, StatusCode::OK);

    let bob_rows = |table: &str| {
        format!("SELECT COUNT(*) FROM {table} WHERE user_id = '{}'", bob.id)
    };
    assert_eq!(app.count(&bob_rows("task_assignments")).await, 0);
    assert_eq!(app.count(&bob_rows("project_members")).await, 0);
    assert_eq!(app.count(&bob_rows("workspace_members")).await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM tasks").await, 1);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM task_comments WHERE user_id IS NULL").await,
        1
    );

    let (comments, _) = app
        .get_auth(&format!("/api/v1/tasks/{task_id}/comments"), &fx.owner.token)
        .await;
    assert_eq!(comments[0]["body"], "mine");
    assert!(comments[0]["authorName"].is_null());

    common::cleanup(app).await;
}

#[tokio::test]
async fn sole_owner_cannot_delete_account() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    assert_eq!(app.join(&bob, &fx.workspace).await, StatusCode::CREATED);

    let (_, status) = app.delete_auth("/api/v1/users/me", &fx.owner.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 2);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM workspace_members WHERE role = 'Owner'").await,
        1
    );

    // Once another owner exists the account can go
    let (body, status) = app
        .put_auth(
            &format!("/api/v1/workspaces/{}/members/{}", fx.workspace_id(), bob.id),
            &fx.owner.token,
            &json!({ "role": "Owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, status) = app.delete_auth("/api/v1/users/me", &fx.owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM workspace_members WHERE role = 'Owner'").await,
        1
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn removing_a_project_member_drops_their_assignments() {
    let app = common::spawn_app().await;
    let fx = fixture(&app).await;
    let bob = app.user("bob").await;
    fx.add_member(&app, &bob).await;
    let task_id = fx.task_in(&app, "To Do", "Handoff").await;
    app.put_auth(
        &format!("/api/v1/tasks/{task_id}/assignees"),
        &fx.owner.token,
        &json!({ "userIds": [bob.id] }),
    )
    .await;

    let path = format!("/api/v1/projects/{}/members/{}", fx.project_id, bob.id);
    let (_, status) = app.delete_auth(&path, &fx.owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count("SELECT COUNT(*) FROM task_assignments").await, 0);

    let (_, status) = app.delete_auth(&path, &fx.owner.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}
