//! HTTP API integration tests.
//!
//! Drive the axum router in-process with `tower::ServiceExt::oneshot` against
//! a gateway rooted in a temporary directory.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use gitapi::api;
use gitapi::core::config::{Config, GatewayConfig};
use gitapi::gateway::Gateway;

struct Server {
    _dir: TempDir,
    router: Router,
}

impl Server {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::from_file_config(GatewayConfig {
            storage_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        let router = api::router(Arc::new(Gateway::new(&config)));
        Self { _dir: dir, router }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn create_repo(&self, name: &str) {
        let (status, _) = self.post("/repos", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn write(&self, repo: &str, branch: &str, path: &str, data: &str) -> String {
        self.write_from(repo, branch, path, data, None).await
    }

    async fn write_from(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        data: &str,
        from_branch: Option<&str>,
    ) -> String {
        let (status, body) = self
            .post(
                &format!("/repos/{repo}/branches/{branch}/files"),
                json!({
                    "name": path,
                    "data": data,
                    "encoding": "utf-8",
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                    "message": format!("write {path}"),
                    "from_branch": from_branch,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["type"], "commit");
        body["commit_sha"].as_str().unwrap().to_string()
    }
}

fn names(tree: &Value) -> Vec<String> {
    let mut names: Vec<String> = tree["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

mod repositories {
    use super::*;

    #[tokio::test]
    async fn health() {
        let server = Server::new();
        let (status, body) = server.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn create_returns_path_with_suffix() {
        let server = Server::new();
        let (status, body) = server.post("/repos", json!({ "name": "test" })).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["path"].as_str().unwrap().ends_with("test.git"));

        let (status, body) = server.get("/repos/test.git").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["path"].as_str().unwrap().ends_with("test.git"));
    }

    #[tokio::test]
    async fn duplicate_is_conflict() {
        let server = Server::new();
        server.create_repo("test").await;
        let (status, body) = server.post("/repos", json!({ "name": "test" })).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "repository_creation_failed");
    }

    #[tokio::test]
    async fn invalid_name_is_bad_request() {
        let server = Server::new();
        let (status, _) = server.post("/repos", json!({ "name": "../up" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let server = Server::new();
        let (status, body) = server.post("/repos", json!({ "nom": "test" })).await;
        assert!(status.is_client_error());
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn missing_repository_is_404_everywhere() {
        let server = Server::new();
        let sha = "a".repeat(40);
        for uri in [
            "/repos/ghost.git".to_string(),
            "/repos/ghost.git/branches".to_string(),
            "/repos/ghost.git/branches/master/files".to_string(),
            "/repos/ghost.git/branches/master/files/a.txt".to_string(),
            format!("/repos/ghost.git/blobs/{sha}"),
            "/repos/ghost.git/refs".to_string(),
            "/repos/ghost.git/tags".to_string(),
            "/repos/ghost.git/commits".to_string(),
            format!("/repos/ghost.git/commits/{sha}"),
            "/repos/ghost.git/blame/a.txt".to_string(),
        ] {
            let (status, body) = server.get(&uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "repository_not_found", "{uri}");
        }
    }
}

mod files {
    use super::*;

    #[tokio::test]
    async fn empty_branch_lists_nothing() {
        let server = Server::new();
        server.create_repo("test").await;
        let (status, body) = server.get("/repos/test.git/branches/master/files").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "tree");
        assert_eq!(body["files"], json!([]));
    }

    #[tokio::test]
    async fn nested_write_then_read() {
        let server = Server::new();
        server.create_repo("test").await;
        server
            .write("test.git", "master", "subfolder/myfile.txt", "Hello There")
            .await;

        let (_, root) = server.get("/repos/test.git/branches/master/files").await;
        assert_eq!(root["files"][0]["name"], "subfolder");
        assert_eq!(root["files"][0]["type"], "tree");

        let (status, blob) = server
            .get("/repos/test.git/branches/master/files/subfolder/myfile.txt")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blob["type"], "blob");
        assert_eq!(blob["name"], "myfile.txt");
        assert_eq!(blob["data"], "Hello There");

        let (status, by_hash) = server
            .get(&format!(
                "/repos/test.git/blobs/{}",
                blob["sha"].as_str().unwrap()
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_hash["data"], "Hello There");
    }

    #[tokio::test]
    async fn two_writes_make_linked_history() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;
        let c2 = server.write("test.git", "master", "b.txt", "b").await;

        let (_, tree) = server.get("/repos/test.git/branches/master/files").await;
        assert_eq!(names(&tree), ["a.txt", "b.txt"]);

        let (status, commits) = server.get("/repos/test.git/commits").await;
        assert_eq!(status, StatusCode::OK);
        let commits = commits.as_array().unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0]["id"], c1.as_str());
        assert_eq!(commits[0]["parents"], json!([]));
        assert_eq!(commits[1]["id"], c2.as_str());
        assert_eq!(commits[1]["parents"], json!([{ "id": c1 }]));
        assert!(commits[0].get("diffs").is_none());
    }

    #[tokio::test]
    async fn from_branch_seeds_new_branch() {
        let server = Server::new();
        server.create_repo("test").await;
        server.write("test.git", "master", "a.txt", "a").await;
        server
            .write_from("test.git", "feature", "b.txt", "b", Some("master"))
            .await;

        let (_, feature) = server.get("/repos/test.git/branches/feature/files").await;
        assert_eq!(names(&feature), ["a.txt", "b.txt"]);
        let (_, master) = server.get("/repos/test.git/branches/master/files").await;
        assert_eq!(names(&master), ["a.txt"]);

        let (_, branches) = server.get("/repos/test.git/branches").await;
        let mut listed: Vec<_> = branches
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["name"].as_str().unwrap().to_string())
            .collect();
        listed.sort();
        assert_eq!(listed, ["feature", "master"]);
    }

    #[tokio::test]
    async fn delete_removes_path() {
        let server = Server::new();
        server.create_repo("test").await;
        server.write("test.git", "master", "a.txt", "a").await;
        server.write("test.git", "master", "gone.txt", "bye").await;

        let (status, body) = server
            .send(
                Method::DELETE,
                "/repos/test.git/branches/master/files/gone.txt",
                Some(json!({
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                    "message": "remove gone.txt",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["type"], "commit");

        let (status, _) = server
            .get("/repos/test.git/branches/master/files/gone.txt")
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn leading_slash_rejected_on_write_and_delete() {
        let server = Server::new();
        server.create_repo("test").await;
        server.write("test.git", "master", "a.txt", "a").await;

        let (status, body) = server
            .post(
                "/repos/test.git/branches/master/files",
                json!({
                    "name": "/b.txt",
                    "data": "b",
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                    "message": "m",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");

        let (status, body) = server
            .send(
                Method::DELETE,
                "/repos/test.git/branches/master/files//a.txt",
                Some(json!({
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                    "message": "m",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, _) = server.get("/repos/test.git/branches/master/files/a.txt").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn binary_content_reads_as_empty() {
        let server = Server::new();
        server.create_repo("test").await;
        // PNG signature followed by NUL bytes.
        let (status, _) = server
            .post(
                "/repos/test.git/branches/master/files",
                json!({
                    "name": "logo.png",
                    "data": "iVBORw0KGgoAAAAA",
                    "encoding": "base64",
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                    "message": "add logo",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, blob) = server
            .get("/repos/test.git/branches/master/files/logo.png")
            .await;
        assert_eq!(blob["data"], "");

        let (_, commits) = server.get("/repos/test.git/commits?diffs=true").await;
        assert_eq!(commits[0]["diffs"][0]["diff"], "");
        assert_eq!(commits[0]["diffs"][0]["new_file"], true);
    }

    #[tokio::test]
    async fn unknown_encoding_is_bad_request() {
        let server = Server::new();
        server.create_repo("test").await;
        let (status, body) = server
            .post(
                "/repos/test.git/branches/master/files",
                json!({
                    "name": "a.txt",
                    "data": "a",
                    "encoding": "ebcdic",
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                    "message": "m",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_encoding");
    }
}

mod history {
    use super::*;

    #[tokio::test]
    async fn single_commit_with_diffs() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "alpha\n").await;

        let (status, commit) = server
            .get(&format!("/repos/test.git/commits/{c1}?diffs=true"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(commit["id"], c1.as_str());
        assert_eq!(commit["author"]["name"], "Rune Madsen");
        assert_eq!(commit["diffs"][0]["b_path"], "a.txt");
        assert!(commit["diffs"][0]["diff"].as_str().unwrap().contains("+alpha"));
    }

    #[tokio::test]
    async fn newest_first_and_bad_order() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;
        let c2 = server.write("test.git", "master", "b.txt", "b").await;

        let (_, commits) = server.get("/repos/test.git/commits?order=newest").await;
        assert_eq!(commits[0]["id"], c2.as_str());
        assert_eq!(commits[1]["id"], c1.as_str());

        let (status, _) = server.get("/repos/test.git/commits?order=sideways").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn blame_on_branch() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "f.txt", "one\ntwo\n").await;

        let (status, blame) = server
            .get("/repos/test.git/blame/f.txt?branch=master")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blame["type"], "blame");
        assert_eq!(blame["hunks"][0]["commit_sha"], c1.as_str());
        assert_eq!(blame["hunks"][0]["lines"], json!(["one", "two"]));
    }
}

mod refs_and_tags {
    use super::*;

    #[tokio::test]
    async fn create_and_get_ref() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;

        let (status, created) = server
            .post(
                "/repos/test.git/refs",
                json!({ "ref": "refs/heads/release", "sha": c1 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{created}");
        assert_eq!(created["ref"], "refs/heads/release");

        let (status, found) = server.get("/repos/test.git/refs/refs/heads/release").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["sha"], c1.as_str());
        assert_eq!(found["type"], "commit");

        let (_, all) = server.get("/repos/test.git/refs").await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (status, _) = server
            .post(
                "/repos/test.git/refs",
                json!({ "ref": "refs/heads/release", "sha": c1 }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn annotated_tag_listed() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;

        let (status, created) = server
            .post(
                "/repos/test.git/tags",
                json!({
                    "tag": "v1.0",
                    "message": "first release",
                    "sha": c1,
                    "type": "commit",
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{created}");
        assert_eq!(created["type"], "tag");

        let (_, tags) = server.get("/repos/test.git/tags").await;
        let tag = &tags[0];
        assert_eq!(tag["tag"], "v1.0");
        assert_eq!(tag["object"]["sha"], c1.as_str());
        assert_eq!(tag["object"]["type"], "commit");
        assert_eq!(tag["tagger"]["name"], "Rune Madsen");
    }

    #[tokio::test]
    async fn tag_by_hash() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;
        let (_, created) = server
            .post(
                "/repos/test.git/tags",
                json!({
                    "tag": "v1.0",
                    "message": "first release",
                    "sha": c1,
                    "type": "commit",
                    "user": "Rune Madsen",
                    "email": "rune@example.com",
                }),
            )
            .await;
        let tag_sha = created["sha"].as_str().unwrap();

        let (status, tag) = server.get(&format!("/repos/test.git/tags/{tag_sha}")).await;
        assert_eq!(status, StatusCode::OK, "{tag}");
        assert_eq!(tag["tag"], "v1.0");
        assert_eq!(tag["object"]["sha"], c1.as_str());

        let (status, _) = server.get(&format!("/repos/test.git/tags/{c1}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_ref_fast_forward_and_force() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;
        let c2 = server.write("test.git", "master", "b.txt", "b").await;

        let (status, body) = server
            .send(
                Method::PATCH,
                "/repos/test.git/refs/refs/heads/master",
                Some(json!({ "sha": c1 })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");
        assert_eq!(body["error"], "write_conflict");

        let (status, moved) = server
            .send(
                Method::PATCH,
                "/repos/test.git/refs/refs/heads/master",
                Some(json!({ "sha": c1, "force": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{moved}");
        assert_eq!(moved["sha"], c1.as_str());

        let (status, moved) = server
            .send(
                Method::PATCH,
                "/repos/test.git/refs/master",
                Some(json!({ "sha": c2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{moved}");
        assert_eq!(moved["ref"], "refs/heads/master");

        let (status, _) = server
            .send(
                Method::PATCH,
                "/repos/test.git/refs/refs/heads/absent",
                Some(json!({ "sha": c2 })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod branches_and_trees {
    use super::*;

    #[tokio::test]
    async fn create_branch_then_write_to_it() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "a.txt", "a").await;

        let (status, head) = server
            .post("/repos/test.git/branches", json!({ "name": "feature" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{head}");
        assert_eq!(head["name"], "feature");
        assert_eq!(head["commit_sha"], c1.as_str());
        assert_eq!(head["type"], "head");

        server.write("test.git", "feature", "b.txt", "b").await;
        let (_, tree) = server.get("/repos/test.git/branches/feature/files").await;
        assert_eq!(names(&tree), ["a.txt", "b.txt"]);

        let (status, _) = server
            .post("/repos/test.git/branches", json!({ "name": "feature" }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn branch_on_empty_repo_not_found() {
        let server = Server::new();
        server.create_repo("test").await;
        let (status, _) = server
            .post("/repos/test.git/branches", json!({ "name": "feature" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tree_by_hash() {
        let server = Server::new();
        server.create_repo("test").await;
        let c1 = server.write("test.git", "master", "dir/a.txt", "a").await;

        let (status, root) = server.get(&format!("/repos/test.git/trees/{c1}")).await;
        assert_eq!(status, StatusCode::OK, "{root}");
        assert_eq!(root["type"], "tree");
        assert_eq!(root["files"][0]["name"], "dir");
        assert_eq!(root["files"][0]["type"], "tree");

        let dir_sha = root["files"][0]["sha"].as_str().unwrap();
        let (status, dir) = server.get(&format!("/repos/test.git/trees/{dir_sha}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&dir), ["a.txt"]);

        let missing = "d".repeat(40);
        let (status, _) = server.get(&format!("/repos/test.git/trees/{missing}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
