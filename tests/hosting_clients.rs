//! Exercises the reqwest-backed GitHub and Gemini clients against a local
//! actix-web server standing in for both APIs.

use std::net::SocketAddr;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use testsmith_core::config::{GeminiConfig, GitHubConfig};
use testsmith_core::contract::{
    Credential, HostingClient, NewFileCommit, NewPullRequest, OAuthProvider, RepositoryCoordinate,
    TextGenerator,
};
use testsmith_core::error::{GenerationError, HostingError};
use testsmith_core::gemini::GeminiClient;
use testsmith_core::github::GitHubClient;
use testsmith_core::publish::{publish, PublishRequest};
use testsmith_core::retrieve::{fetch_contents, list_files};

const TOKEN: &str = "gho_fake";

fn authorized(req: &HttpRequest) -> bool {
    let auth = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());
    let api_version = req
        .headers()
        .get("X-GitHub-Api-Version")
        .and_then(|v| v.to_str().ok());
    auth == Some(&format!("Bearer {TOKEN}")[..]) && api_version == Some("2022-11-28")
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({"message": "Bad credentials"}))
}

async fn repo_info(req: HttpRequest, path: web::Path<(String, String)>) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    let (owner, repo) = path.into_inner();
    match repo.as_str() {
        "missing" => HttpResponse::NotFound().json(json!({"message": "Not Found"})),
        "empty" => HttpResponse::Ok().json(json!({"full_name": format!("{owner}/{repo}")})),
        _ => HttpResponse::Ok().json(json!({
            "full_name": format!("{owner}/{repo}"),
            "default_branch": "trunk"
        })),
    }
}

async fn user_repos(req: HttpRequest) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!([{
        "id": 1,
        "name": "widgets",
        "full_name": "acme/widgets",
        "owner": {"login": "acme", "id": 9},
        "private": true,
        "default_branch": "trunk",
        "html_url": "https://github.com/acme/widgets",
        "description": null
    }]))
}

async fn tree(req: HttpRequest, path: web::Path<(String, String, String)>) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    let (_, _, tree_ish) = path.into_inner();
    if tree_ish != "trunk" || req.query_string() != "recursive=1" {
        return HttpResponse::NotFound().json(json!({"message": "Not Found"}));
    }
    HttpResponse::Ok().json(json!({
        "sha": "root",
        "tree": [
            {"path": "src", "mode": "040000", "type": "tree", "sha": "t1"},
            {"path": "src/app.js", "mode": "100644", "type": "blob", "sha": "abc123", "size": 12},
            {"path": "README.md", "mode": "100644", "type": "blob", "sha": "def456", "size": 7}
        ],
        "truncated": true
    }))
}

async fn blob(req: HttpRequest, path: web::Path<(String, String, String)>) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    let (_, _, sha) = path.into_inner();
    match sha.as_str() {
        // "console.log(1);\n"
        "abc123" => HttpResponse::Ok().json(json!({
            "sha": "abc123",
            "content": "Y29uc29s\nZS5sb2co\nMSk7Cg==\n",
            "encoding": "base64",
            "url": format!("http://{}/repos/acme/widgets/git/blobs/abc123", req.connection_info().host()),
            "size": 16
        })),
        _ => HttpResponse::NotFound().json(json!({"message": "Not Found"})),
    }
}

async fn branch_ref(req: HttpRequest, path: web::Path<(String, String, String)>) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    let (_, _, branch) = path.into_inner();
    HttpResponse::Ok().json(json!({
        "ref": format!("refs/heads/{branch}"),
        "object": {"sha": "base-sha", "type": "commit"}
    }))
}

async fn create_ref(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    if body["ref"] == "refs/heads/testsmith/test-1" && body["sha"] == "base-sha" {
        HttpResponse::Created().json(json!({"ref": body["ref"], "object": {"sha": "base-sha"}}))
    } else {
        HttpResponse::UnprocessableEntity().json(json!({"message": "Reference already exists"}))
    }
}

async fn delete_ref(req: HttpRequest) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    HttpResponse::NoContent().finish()
}

async fn put_contents(
    req: HttpRequest,
    path: web::Path<(String, String, String)>,
    body: web::Json<Value>,
) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    let (_, repo, file) = path.into_inner();
    if repo == "specials" {
        // the raw path must carry the reserved characters percent-encoded
        let expected = [
            "/repos/acme/specials/contents/tests/issue%2342.spec.js",
            "/repos/acme/specials/contents/tests/what%3F.spec.js",
            "/repos/acme/specials/contents/tests/100%25.spec.js",
        ];
        return if expected.contains(&req.uri().path()) && req.query_string().is_empty() {
            HttpResponse::Created().json(json!({"content": {"path": file}}))
        } else {
            HttpResponse::UnprocessableEntity().json(json!({"message": "Invalid path"}))
        };
    }
    // "test();" in base64
    if file == "tests/app.spec.js"
        && body["content"] == "dGVzdCgpOw=="
        && body["branch"] == "testsmith/test-1"
        && body["message"] == "Add generated test case"
    {
        HttpResponse::Created().json(json!({"content": {"path": file}}))
    } else {
        HttpResponse::UnprocessableEntity().json(json!({"message": "Invalid request"}))
    }
}

async fn create_pull(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> HttpResponse {
    if !authorized(&req) {
        return unauthorized();
    }
    let (owner, repo) = path.into_inner();
    if repo == "no-pulls" {
        return HttpResponse::UnprocessableEntity().json(json!({"message": "Validation Failed"}));
    }
    if body["base"] != "trunk" || body["head"] != "testsmith/test-1" {
        return HttpResponse::UnprocessableEntity().json(json!({"message": "Validation Failed"}));
    }
    HttpResponse::Created().json(json!({
        "number": 5,
        "html_url": format!("https://github.com/{owner}/{repo}/pull/5"),
        "state": "open"
    }))
}

async fn access_token(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    let wants_json = req
        .headers()
        .get("Accept")
        .and_then(|v| v.to_str().ok())
        == Some("application/json");
    if !wants_json || body["client_id"] != "cid" || body["client_secret"] != "csecret" {
        return HttpResponse::BadRequest().finish();
    }
    if body["code"] == "good" {
        HttpResponse::Ok().json(json!({
            "access_token": "gho_new",
            "token_type": "bearer",
            "scope": "repo"
        }))
    } else {
        HttpResponse::Ok().json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
    }
}

async fn generate_content(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    let key = req
        .headers()
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok());
    if key != Some("gemini-key") {
        return HttpResponse::Forbidden().json(json!({"error": {"message": "API key not valid"}}));
    }
    if path.into_inner() != "gemini-2.0-flash:generateContent" {
        return HttpResponse::NotFound().finish();
    }
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    if prompt == "silence" {
        return HttpResponse::Ok().json(json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]}));
    }
    HttpResponse::Ok().json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "1. First"}, {"text": "\n2. Second"}]},
            "finishReason": "STOP"
        }]
    }))
}

/// Starts the fake API on an ephemeral port.
fn start_fake() -> SocketAddr {
    let server = HttpServer::new(|| {
        App::new()
            .route("/user/repos", web::get().to(user_repos))
            .route("/repos/{owner}/{repo}", web::get().to(repo_info))
            .route("/repos/{owner}/{repo}/git/trees/{tree}", web::get().to(tree))
            .route("/repos/{owner}/{repo}/git/blobs/{sha}", web::get().to(blob))
            .route("/repos/{owner}/{repo}/git/ref/heads/{branch:.*}", web::get().to(branch_ref))
            .route("/repos/{owner}/{repo}/git/refs", web::post().to(create_ref))
            .route("/repos/{owner}/{repo}/git/refs/heads/{branch:.*}", web::delete().to(delete_ref))
            .route("/repos/{owner}/{repo}/contents/{path:.*}", web::put().to(put_contents))
            .route("/repos/{owner}/{repo}/pulls", web::post().to(create_pull))
            .route("/login/oauth/access_token", web::post().to(access_token))
            .route("/models/{call}", web::post().to(generate_content))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .expect("bind fake server");

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    addr
}

fn github(addr: SocketAddr) -> GitHubClient {
    let mut config = GitHubConfig::new("cid", "csecret");
    config.api_base = format!("http://{addr}");
    config.web_base = format!("http://{addr}/");
    GitHubClient::new(config).expect("client")
}

fn gemini(addr: SocketAddr, key: &str) -> GeminiClient {
    let mut config = GeminiConfig::new(key);
    config.api_base = format!("http://{addr}");
    GeminiClient::new(config).expect("client")
}

fn credential() -> Credential {
    Credential::new(TOKEN)
}

#[actix_web::test]
async fn test_list_files_resolves_default_branch_and_filters_tree() {
    let addr = start_fake();
    let client = github(addr);

    let files = list_files(&client, &credential(), &RepositoryCoordinate::new("acme", "widgets"))
        .await
        .expect("files");

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/app.js", "README.md"]);
    assert_eq!(files[0].sha, "abc123");
    assert_eq!(files[0].size, Some(12));
}

#[actix_web::test]
async fn test_list_repositories_parses_descriptors() {
    let addr = start_fake();
    let client = github(addr);

    let repos = client.list_repositories(&credential()).await.expect("repos");
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].full_name, "acme/widgets");
    assert_eq!(repos[0].owner.login, "acme");
    assert!(repos[0].private);
    assert_eq!(repos[0].default_branch.as_deref(), Some("trunk"));
}

#[actix_web::test]
async fn test_bad_credential_surfaces_status() {
    let addr = start_fake();
    let client = github(addr);

    let err = client
        .list_repositories(&Credential::new("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, HostingError::Status { status: 401, .. }));
}

#[actix_web::test]
async fn test_missing_repository_is_not_found_status() {
    let addr = start_fake();
    let client = github(addr);

    let err = client
        .default_branch(&credential(), &RepositoryCoordinate::new("acme", "missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let branch = client
        .default_branch(&credential(), &RepositoryCoordinate::new("acme", "empty"))
        .await
        .expect("repo info");
    assert_eq!(branch, None);
}

#[actix_web::test]
async fn test_blob_content_is_decoded_across_line_wraps() {
    let addr = start_fake();
    let client = github(addr);

    let contents = fetch_contents(
        &client,
        &credential(),
        &RepositoryCoordinate::new("acme", "widgets"),
        &["abc123".to_string()],
    )
    .await
    .expect("contents");

    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].blob_id, "abc123");
    assert_eq!(contents[0].text, "console.log(1);\n");
    assert!(contents[0].source_url.ends_with("/git/blobs/abc123"));
}

#[actix_web::test]
async fn test_publish_against_fake_api() {
    let addr = start_fake();
    let client = github(addr);

    let request = PublishRequest {
        repo: RepositoryCoordinate::new("acme", "widgets"),
        file_path: "tests/app.spec.js".to_string(),
        branch: "testsmith/test-1".to_string(),
        content: "test();".to_string(),
        commit_message: "Add generated test case".to_string(),
        pr_title: "Add generated test case".to_string(),
        pr_body: String::new(),
    };
    let receipt = publish(&client, &credential(), &request)
        .await
        .expect("publish");

    assert_eq!(receipt.pr_url, "https://github.com/acme/widgets/pull/5");
    assert_eq!(receipt.pr_number, 5);
    assert_eq!(receipt.base_branch, "trunk");
}

#[actix_web::test]
async fn test_raw_write_calls() {
    let addr = start_fake();
    let client = github(addr);
    let repo = RepositoryCoordinate::new("acme", "widgets");

    client
        .create_branch(&credential(), &repo, "testsmith/test-1", "base-sha")
        .await
        .expect("branch");
    client
        .put_file(
            &credential(),
            &repo,
            NewFileCommit {
                path: "/tests/app.spec.js".to_string(),
                branch: "testsmith/test-1".to_string(),
                message: "Add generated test case".to_string(),
                content_base64: "dGVzdCgpOw==".to_string(),
            },
        )
        .await
        .expect("commit");
    client
        .delete_branch(&credential(), &repo, "testsmith/test-1")
        .await
        .expect("delete");

    let err = client
        .create_pull_request(
            &credential(),
            &RepositoryCoordinate::new("acme", "no-pulls"),
            NewPullRequest {
                title: "t".to_string(),
                head: "testsmith/test-1".to_string(),
                base: "trunk".to_string(),
                body: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HostingError::Status { status: 422, .. }));
}

#[actix_web::test]
async fn test_put_file_encodes_reserved_characters_in_path() {
    let addr = start_fake();
    let client = github(addr);
    let repo = RepositoryCoordinate::new("acme", "specials");

    for path in ["tests/issue#42.spec.js", "tests/what?.spec.js", "tests/100%.spec.js"] {
        client
            .put_file(
                &credential(),
                &repo,
                NewFileCommit {
                    path: path.to_string(),
                    branch: "testsmith/test-1".to_string(),
                    message: "Add generated test case".to_string(),
                    content_base64: "dGVzdCgpOw==".to_string(),
                },
            )
            .await
            .unwrap_or_else(|e| panic!("commit {path}: {e}"));
    }
}

#[test]
fn test_unusable_api_base_is_rejected() {
    let mut config = GitHubConfig::new("cid", "csecret");
    config.api_base = "not a url".to_string();
    assert!(matches!(
        GitHubClient::new(config),
        Err(HostingError::InvalidBaseUrl(_))
    ));
}

#[actix_web::test]
async fn test_oauth_code_exchange() {
    let addr = start_fake();
    let client = github(addr);

    assert_eq!(
        client.authorize_url(),
        format!("http://{addr}/login/oauth/authorize?client_id=cid&scope=repo")
    );

    let credential = client.exchange_code("good").await.expect("token");
    assert_eq!(credential.expose(), "gho_new");

    let err = client.exchange_code("stale").await.unwrap_err();
    match err {
        HostingError::Decode(reason) => {
            assert_eq!(reason, "The code passed is incorrect or expired.")
        }
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[actix_web::test]
async fn test_gemini_generate_joins_parts() {
    let addr = start_fake();

    let text = gemini(addr, "gemini-key")
        .generate("list tests")
        .await
        .expect("text");
    assert_eq!(text, "1. First\n2. Second");
}

#[actix_web::test]
async fn test_gemini_failures() {
    let addr = start_fake();

    let err = gemini(addr, "wrong-key").generate("x").await.unwrap_err();
    assert!(matches!(err, GenerationError::Status { status: 403, .. }));

    let err = gemini(addr, "gemini-key")
        .generate("silence")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Empty));
}
