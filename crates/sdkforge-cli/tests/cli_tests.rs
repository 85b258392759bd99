use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../sdkforge-core/tests/fixtures");

fn fixture(name: &str) -> String {
    format!("{FIXTURES}/{name}")
}

/// Run the binary inside `dir`, so no stray config file is picked up.
fn sdkforge(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sdkforge"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn generates_package_from_local_file() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = fixture("petstore.yaml");
    let output = sdkforge(tmp.path(), &[&spec, "-o", "out", "--package-name", "pet_client"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let out = tmp.path().join("out");
    for file in [
        "pet_client/__init__.py",
        "pet_client/models.py",
        "pet_client/client.py",
        "pet_client/api/pets.py",
        "pyproject.toml",
    ] {
        assert!(out.join(file).is_file(), "missing {file}");
    }
    assert!(stderr(&output).contains("wrote"));
}

#[test]
fn target_version_flag_changes_annotations() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = fixture("petstore.yaml");
    let output = sdkforge(tmp.path(), &[&spec, "-o", "out", "--target-version", "3.8"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let models = fs::read_to_string(tmp.path().join("out/petstore/models.py")).unwrap();
    assert!(models.contains("Optional[str]"));
}

#[test]
fn config_file_supplies_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let config = format!(
        "input: {}\noutput: sdk\npackage_name: from_config\n",
        fixture("petstore.yaml")
    );
    fs::write(tmp.path().join(".sdkforge.yaml"), config).unwrap();

    let output = sdkforge(tmp.path(), &[]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(tmp.path().join("sdk/from_config/client.py").is_file());
}

#[test]
fn init_refuses_to_overwrite() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(sdkforge(tmp.path(), &["--init"]).status.success());
    assert!(tmp.path().join(".sdkforge.yaml").is_file());

    let again = sdkforge(tmp.path(), &["--init"]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("already exists"));
}

#[test]
fn inspect_prints_summary_without_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = fixture("petstore.yaml");
    let output = sdkforge(tmp.path(), &[&spec, "-o", "out", "--inspect", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(!tmp.path().join("out").exists());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["info"]["title"], "Petstore");
    assert_eq!(summary["target_version"], "3.13");
    assert_eq!(summary["types"][0]["name"], "PetStatus");
    assert_eq!(summary["modules"][1]["name"], "pets");
    assert_eq!(summary["modules"][1]["operations"][0]["name"], "listPets");
}

#[test]
fn pipeline_errors_exit_non_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = fixture("invalid.yaml");
    let output = sdkforge(tmp.path(), &[&spec, "-o", "out"]);
    assert!(!output.status.success());

    let message = stderr(&output);
    assert!(message.contains("generation failed with 3 errors:"), "{message}");
    assert!(message.contains("missingScheme"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn missing_spec_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let output = sdkforge(tmp.path(), &["-o", "out"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no spec given"));
}

#[test]
fn help_is_long_only() {
    let tmp = tempfile::tempdir().unwrap();
    let output = sdkforge(tmp.path(), &["--help"]);
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("-h, --header"));
}

#[test]
fn remote_spec_failure_status_is_reported() {
    use axum::Router;
    use axum::routing::get;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let app = Router::new().route("/openapi.yaml", get(|| async { "openapi: 3.1.0" }));
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    let tmp = tempfile::tempdir().unwrap();
    let url = format!("http://{addr}/missing.yaml");
    let output = sdkforge(tmp.path(), &[&url, "-o", "out", "-h", "Authorization: Bearer t"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to fetch specification (Status: 404)"));
}
