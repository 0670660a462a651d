use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("serve")
                .and(predicate::str::contains("categories"))
                .and(predicate::str::contains("comments"))
                .and(predicate::str::contains("tags"))
                .and(predicate::str::contains("options")),
        );
}

#[test]
fn test_tags_resolve_requires_ids() {
    Command::cargo_bin("cli")
        .unwrap()
        .args(["tags", "resolve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_missing_database_url_is_reported() {
    let dir = std::env::temp_dir();

    Command::cargo_bin("cli")
        .unwrap()
        .current_dir(dir)
        .env_remove("DATABASE_URL")
        .args(["categories", "tree"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}
