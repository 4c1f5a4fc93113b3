use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const MANIFEST: &str = r#"
[emit]
rust = "build/autoconfig.rs"
make = "{manifest_dir}/build/autoconfig.mk"

[[emit.templates]]
name = "list"
source = "list.j2"
output = "build/services.txt"

[[tasks]]
name = "uart-thread"
file = "uart-thread.elf"
mem = [[0x120000000, 0x9000000, 0x1000]]
cfg = ["uart_ipc"]

[[tasks]]
name = "shell"
file = "shell.elf"
deps = ["uart-thread", "parser"]
cfg = ["shell"]

[[tasks]]
name = "parser"
file = "parser.elf"
mem = [[0x200000, 0x200000, 0x2000]]
cfg = ["parser"]

[[tasks]]
name = "fs"
file = "fs.elf"
deps = ["uart-thread"]
"#;

fn setup(dir: &Path) {
    fs::write(dir.join("apps.toml"), MANIFEST).unwrap();
    fs::write(dir.join("list.j2"), "{% for c in plan.components %}{{ c.name }}\n{% endfor %}").unwrap();
    fs::write(dir.join("select.toml"), "module-selected = [\"shell\", \"fs\"]\n").unwrap();
}

fn svcplan(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("svcplan").unwrap();
    cmd.current_dir(dir)
        .env_remove("SVCPLAN_MANIFEST")
        .env_remove("SVCPLAN_SELECT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn writes_configured_outputs() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    svcplan(dir.path()).arg("select.toml").assert().success();

    let rust = fs::read_to_string(dir.path().join("build/autoconfig.rs")).unwrap();
    assert!(rust.contains("name: \"uart-thread\""));
    assert!(rust.contains("name: \"shell\""));
    assert!(rust.contains("mem: &[(0x200000, 0x200000, 0x2000)]"));
    assert!(!rust.contains("name: \"parser\""));

    let make = fs::read_to_string(dir.path().join("build/autoconfig.mk")).unwrap();
    assert!(make.ends_with("RUSTFLAGS += --cfg=uart_ipc --cfg=shell\n"));

    let list = fs::read_to_string(dir.path().join("build/services.txt")).unwrap();
    assert_eq!(list, "uart-thread\nshell\nfs\n");
}

#[test]
fn stdout_mode_prints_fragments() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    svcplan(dir.path())
        .args(["--stdout", "--root", "shell", "--flag-policy", "transitive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pub const TASK_FILES: &[KernelServices] = &["))
        .stdout(predicate::str::contains("RUSTFLAGS += --cfg=shell --cfg=uart_ipc --cfg=parser"));

    assert!(!dir.path().join("build").exists());
}

#[test]
fn json_plan_and_report() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = svcplan(dir.path())
        .args(["select.toml", "--json", "--stdout", "--report", "summary", "-q"])
        .assert()
        .success()
        .stderr(predicate::str::contains("  - parser (folded, visits=1)"))
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(out).unwrap();
    let json_end = text.find("// generated").unwrap();
    let v: serde_json::Value = serde_json::from_str(&text[..json_end]).unwrap();
    assert_eq!(v["components"].as_array().unwrap().len(), 3);
}

#[test]
fn json_without_outputs_still_prints_fragments() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("apps.toml"),
        "[[tasks]]\nname = \"uart-thread\"\nfile = \"uart-thread.elf\"\n",
    )
    .unwrap();

    let out = svcplan(dir.path())
        .args(["--json", "--root", "uart-thread"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pub const TASK_FILES"))
        .stdout(predicate::str::contains("RUSTFLAGS +="))
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(out).unwrap();
    let json_end = text.find("// generated").unwrap();
    let v: serde_json::Value = serde_json::from_str(&text[..json_end]).unwrap();
    assert_eq!(v["components"].as_array().unwrap().len(), 1);
}

#[test]
fn empty_selection_fails() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    fs::write(dir.path().join("none.toml"), "module-selected = []\n").unwrap();

    svcplan(dir.path())
        .arg("none.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no modules selected"));
}

#[test]
fn unknown_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    svcplan(dir.path())
        .args(["--root", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'ghost' is not declared"));
}

#[test]
fn missing_manifest_mentions_overrides() {
    let dir = tempfile::tempdir().unwrap();

    svcplan(dir.path())
        .args(["--root", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SVCPLAN_MANIFEST"));
}

#[test]
fn manifest_from_env() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    let elsewhere = tempfile::tempdir().unwrap();

    svcplan(elsewhere.path())
        .env("SVCPLAN_MANIFEST", dir.path().join("apps.toml"))
        .env("SVCPLAN_SELECT", dir.path().join("select.toml"))
        .assert()
        .success();

    assert!(dir.path().join("build/autoconfig.rs").exists());
}
