//! End-to-end listing tests driving `ListingService` through a scripted
//! runner and real tempdir workspaces.

use async_trait::async_trait;
use projtree::error::ApiError;
use projtree::listing::ListingService;
use projtree::runner::{CliOutput, CliRunner};
use projtree::settings::Settings;
use projtree::types::{record_str, EntityKind};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Scripted stand-in for the project CLI.
#[derive(Default)]
struct MockRunner {
    script: Vec<(Option<PathBuf>, String, Outcome)>,
}

enum Outcome {
    Ok(String),
    Fail(String),
    NotFound,
}

impl MockRunner {
    fn on(mut self, args: &str, outcome: Outcome) -> Self {
        self.script.push((None, args.to_string(), outcome));
        self
    }

    fn on_root(mut self, root: &Path, args: &str, outcome: Outcome) -> Self {
        self.script
            .push((Some(root.to_path_buf()), args.to_string(), outcome));
        self
    }
}

#[async_trait]
impl CliRunner for MockRunner {
    async fn run(&self, root: &Path, args: &[String]) -> Result<CliOutput, ApiError> {
        let key = args.join(" ");
        for (root_filter, expected, outcome) in &self.script {
            if let Some(filter) = root_filter {
                if filter != root {
                    continue;
                }
            }
            if *expected == key {
                return match outcome {
                    Outcome::Ok(stdout) => Ok(CliOutput {
                        stdout: stdout.clone(),
                        stderr: String::new(),
                    }),
                    Outcome::Fail(message) => Err(ApiError::ToolFailed(message.clone())),
                    Outcome::NotFound => Err(ApiError::ToolNotFound {
                        command: "proj".to_string(),
                    }),
                };
            }
        }
        Err(ApiError::ToolFailed(format!("unscripted invocation: {}", key)))
    }

    fn command(&self) -> &str {
        "proj"
    }
}

fn service(runner: MockRunner) -> ListingService {
    ListingService::new(Arc::new(runner), Settings::default())
}

#[tokio::test]
async fn test_org_listing_reconciles_live_and_declarative() {
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("proj.yml"),
        "orgs:\n  scratch:\n    - qa\n    - feature\n",
    )
    .unwrap();

    let live = json!({"orgs": [
        {"alias": "qa", "is_scratch": true, "days": "3/7", "domain": "qa.example.test"},
        {"alias": "prod", "instance_url": "https://prod.example"}
    ]});
    let runner = MockRunner::default().on("org list --json", Outcome::Ok(live.to_string()));

    let orgs = service(runner).list_orgs(workspace.path()).await.unwrap();
    let aliases: Vec<&str> = orgs
        .iter()
        .map(|o| record_str(o, &["alias"]).unwrap())
        .collect();
    assert_eq!(aliases, vec!["feature", "prod", "qa"]);

    let feature = &orgs[0];
    assert_eq!(feature["definition_only"], json!(true));
    assert_eq!(feature["org_created"], json!(false));

    let qa = &orgs[2];
    assert_eq!(qa["is_scratch"], json!(true));
    assert!(qa.get("definition_missing").is_none());
    assert!(qa["config_sources"]
        .as_array()
        .unwrap()
        .contains(&json!("proj.yml")));
}

#[tokio::test]
async fn test_json_flag_unsupported_falls_back_to_text() {
    let workspace = TempDir::new().unwrap();
    let runner = MockRunner::default()
        .on(
            "task list --json",
            Outcome::Fail("Usage error: no such option: --json".to_string()),
        )
        .on(
            "task list",
            Outcome::Ok(
                "Name     Description\n-------  -----------\ndeploy   Push the build\nlint\n"
                    .to_string(),
            ),
        );

    let tasks = service(runner).list_tasks(workspace.path()).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["name"], json!("deploy"));
    assert_eq!(tasks[0]["description"], json!("Push the build"));
    assert_eq!(tasks[1]["name"], json!("lint"));
}

#[tokio::test]
async fn test_task_listing_merges_declarative_stubs() {
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("proj.yml"),
        "tasks:\n  deploy:\n    description: config desc\n    group: Custom\n  docs: \"Build the docs\"\n",
    )
    .unwrap();

    let live = json!({"tasks": [{"name": "deploy", "description": "live desc"}]});
    let runner = MockRunner::default().on("task list --json", Outcome::Ok(live.to_string()));

    let tasks = service(runner).list_tasks(workspace.path()).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["description"], json!("live desc"));
    assert_eq!(tasks[0]["group"], json!("Custom"));
    assert_eq!(tasks[1]["name"], json!("docs"));
    assert_eq!(tasks[1]["group"], json!("Project Config"));
}

#[tokio::test]
async fn test_banner_before_empty_json_listing_stays_empty() {
    let workspace = TempDir::new().unwrap();
    let runner = MockRunner::default().on(
        "org list --json",
        Outcome::Ok("Loading project...\n{\"orgs\": []}".to_string()),
    );
    let orgs = service(runner).list_orgs(workspace.path()).await.unwrap();
    assert!(orgs.is_empty());
}

#[tokio::test]
async fn test_org_listing_surfaces_deduplicated_expiry_notices() {
    let workspace = TempDir::new().unwrap();
    let live = json!({"orgs": [
        {"alias": "qa", "is_scratch": true, "days": "2/7", "domain": "qa.example.test"},
        {"alias": "prod", "instance_url": "https://prod.example"},
        {"alias": "fresh", "is_scratch": true, "days": "20/30", "domain": "fresh.example.test"}
    ]});
    let listing = service(MockRunner::default().on("org list --json", Outcome::Ok(live.to_string())));

    let orgs = listing.list_orgs(workspace.path()).await.unwrap();
    let notices = listing.expiry_notices(&orgs);
    assert_eq!(notices, vec!["Scratch org 'qa' expires in 2 days".to_string()]);

    // Same counts again within the session: nothing new to say.
    assert!(listing.expiry_notices(&orgs).is_empty());
}

#[tokio::test]
async fn test_service_listing_from_wrapped_table() {
    let workspace = TempDir::new().unwrap();
    let table = "\
Default  Type    Name  Description
-------  ------  ----  ----------------------
*        github  main  GitHub credential used
                       by the release pipeline
";
    let runner = MockRunner::default()
        .on(
            "service list --json",
            Outcome::Fail("no such option: --json".to_string()),
        )
        .on("service list", Outcome::Ok(table.to_string()));

    let groups = service(runner)
        .list_services(workspace.path())
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].service_type, "github");
    let entry = &groups[0].services[0];
    assert!(entry.is_default);
    assert_eq!(
        entry.description.as_deref(),
        Some("GitHub credential used by the release pipeline")
    );
}

#[tokio::test]
async fn test_org_info_tolerates_banner_and_table_fallback() {
    let workspace = TempDir::new().unwrap();
    let runner = MockRunner::default().on(
        "org info qa --json",
        Outcome::Ok("Loading org...\n{\"alias\":\"qa\",\"days\":\"3/7\"}".to_string()),
    );
    let record = service(runner)
        .org_info(workspace.path(), "qa")
        .await
        .unwrap();
    assert_eq!(record["alias"], json!("qa"));

    let runner = MockRunner::default()
        .on(
            "org info qa --json",
            Outcome::Fail("no such option: --json".to_string()),
        )
        .on(
            "org info qa",
            Outcome::Ok(
                "Key     Value\n------  ---------------\nalias   qa\ndomain  qa.example.test\n"
                    .to_string(),
            ),
        );
    let record = service(runner)
        .org_info(workspace.path(), "qa")
        .await
        .unwrap();
    assert_eq!(record["alias"], json!("qa"));
    assert_eq!(record["domain"], json!("qa.example.test"));
}

#[tokio::test]
async fn test_per_root_failure_isolation() {
    let good = TempDir::new().unwrap();
    let bad = TempDir::new().unwrap();
    let live = json!({"orgs": [{"alias": "qa", "domain": "qa.example.test"}]});
    let runner = MockRunner::default()
        .on_root(
            good.path(),
            "org list --json",
            Outcome::Ok(live.to_string()),
        )
        .on_root(
            bad.path(),
            "org list --json",
            Outcome::Fail("connection refused".to_string()),
        );

    let roots = vec![good.path().to_path_buf(), bad.path().to_path_buf()];
    let listings = service(runner).list_roots(EntityKind::Org, &roots).await;
    assert_eq!(listings.len(), 2);
    assert!(listings[0].outcome.is_ok());
    assert_eq!(listings[0].outcome.as_ref().unwrap().len(), 1);
    match &listings[1].outcome {
        Err(ApiError::ToolFailed(message)) => assert_eq!(message, "connection refused"),
        other => panic!("expected failure for bad root, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tool_not_found_propagates_untouched() {
    let workspace = TempDir::new().unwrap();
    let runner = MockRunner::default().on("flow list --json", Outcome::NotFound);
    let err = service(runner)
        .list_flows(workspace.path())
        .await
        .unwrap_err();
    match err {
        ApiError::ToolNotFound { command } => assert_eq!(command, "proj"),
        other => panic!("expected ToolNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_genuine_failure_is_not_mistaken_for_flag_gap() {
    let workspace = TempDir::new().unwrap();
    let runner = MockRunner::default().on(
        "task list --json",
        Outcome::Fail("project config is invalid".to_string()),
    );
    let err = service(runner)
        .list_tasks(workspace.path())
        .await
        .unwrap_err();
    match err {
        ApiError::ToolFailed(message) => assert_eq!(message, "project config is invalid"),
        other => panic!("expected ToolFailed, got {:?}", other),
    }
}
