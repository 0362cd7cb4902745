use sitesync::tooling::cli::{CliContext, Commands};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Workspace {
    _temp: TempDir,
    context: CliContext,
    root: PathBuf,
    remote: PathBuf,
}

fn workspace() -> Workspace {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("sitesync.toml");
    fs::write(&config, "[reconciler]\nextra_ignore_globs = [\"*.tmp\"]\n").unwrap();
    let root = temp.path().join("datasites").join("alice@example.org");
    fs::create_dir_all(root.join("public")).unwrap();
    fs::write(root.join("public").join("index.html"), "<h1>hi</h1>").unwrap();
    fs::write(root.join("draft.tmp"), "wip").unwrap();
    let remote = temp.path().join("remote");
    fs::create_dir_all(&remote).unwrap();

    let context = CliContext::new(temp.path().to_path_buf(), Some(config)).unwrap();
    Workspace {
        _temp: temp,
        context,
        root,
        remote,
    }
}

#[test]
fn config_file_is_applied() {
    let ws = workspace();
    assert_eq!(
        ws.context.config().reconciler.extra_ignore_globs,
        vec!["*.tmp".to_string()]
    );
}

#[test]
fn snapshot_then_status_reports_in_sync() {
    let ws = workspace();
    let manifest = ws.remote.join("alice@example.org.json");
    let output = ws
        .context
        .execute(&Commands::Snapshot {
            root: ws.root.clone(),
            out: Some(manifest.clone()),
        })
        .unwrap();
    assert!(output.contains("Wrote 1 entries"));
    let listed: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
    let paths: Vec<&str> = listed.iter().map(|e| e["path"].as_str().unwrap()).collect();
    assert_eq!(paths, vec!["public/index.html"]);

    let status = ws
        .context
        .execute(&Commands::Status {
            root: ws.root.clone(),
            remote: ws.remote.clone(),
        })
        .unwrap();
    assert!(status.contains("alice@example.org"));
    assert!(status.contains("in sync"));
    assert!(!status.contains("out of sync"));
}

#[test]
fn snapshot_applies_the_datasite_ignore_file() {
    let ws = workspace();
    fs::write(ws.root.join("_.syftignore"), "# local only\nscratch\n").unwrap();
    fs::create_dir_all(ws.root.join("scratch")).unwrap();
    fs::write(ws.root.join("scratch").join("notes.md"), "todo").unwrap();

    let output = ws
        .context
        .execute(&Commands::Snapshot {
            root: ws.root.clone(),
            out: None,
        })
        .unwrap();
    let listed: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
    let paths: Vec<&str> = listed.iter().map(|e| e["path"].as_str().unwrap()).collect();
    assert_eq!(paths, vec!["_.syftignore", "public/index.html"]);
}

#[test]
fn reconcile_json_lists_uploads() {
    let ws = workspace();
    fs::write(ws.remote.join("alice@example.org.json"), "[]").unwrap();
    let output = ws
        .context
        .execute(&Commands::Reconcile {
            root: ws.root.clone(),
            remote: ws.remote.clone(),
            format: "json".to_string(),
        })
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["summary"]["queued"], 1);
    assert_eq!(value["summary"]["ignored"], 1);
    let change = &value["file_changes"][0];
    assert_eq!(change["path"], "public/index.html");
    assert_eq!(change["authoritative_side"], "local");
    assert_eq!(change["kind"], "create");
}

#[test]
fn reconcile_text_renders_table() {
    let ws = workspace();
    fs::write(ws.remote.join("alice@example.org.json"), "[]").unwrap();
    let output = ws
        .context
        .execute(&Commands::Reconcile {
            root: ws.root.clone(),
            remote: ws.remote.clone(),
            format: "text".to_string(),
        })
        .unwrap();
    assert!(output.contains("public/index.html"));
    assert!(output.contains("upload"));
    assert!(output.contains("1 queued (0 permission)"));
}

#[test]
fn missing_remote_manifest_is_an_error() {
    let ws = workspace();
    let err = ws
        .context
        .execute(&Commands::Reconcile {
            root: ws.root.clone(),
            remote: ws.remote.clone(),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(err.to_string().contains("remote state unavailable"));
}

#[test]
fn unknown_output_format_is_rejected() {
    let ws = workspace();
    let result = ws.context.execute(&Commands::Reconcile {
        root: ws.root.clone(),
        remote: ws.remote.clone(),
        format: "yaml".to_string(),
    });
    assert!(result.is_err());
}
