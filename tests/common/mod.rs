#![allow(dead_code)]

pub mod mock_data;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Runs the ticketsync binary in an isolated temp directory.
pub struct SyncTest {
    pub temp_dir: TempDir,
}

impl SyncTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        SyncTest { temp_dir }
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join(".ticketsync")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ticketsync"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("TICKETSYNC_ROOT", self.root())
            .env_remove("JIRA_API_TOKEN")
            .env_remove("TICKETSYNC_LOG")
            .output()
            .expect("Failed to execute ticketsync command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn write_config(&self, content: &str) {
        fs::create_dir_all(self.root()).expect("Failed to create .ticketsync directory");
        fs::write(self.root().join("config.yaml"), content).expect("Failed to write config file");
    }

    pub fn exists(&self, relative_path: &str) -> bool {
        self.temp_dir.path().join(relative_path).exists()
    }
}

/// A temp directory holding a ticket file and a state file for engine tests.
pub struct Workspace {
    pub temp_dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn tickets_path(&self) -> PathBuf {
        self.temp_dir.path().join("tickets.yaml")
    }

    pub fn state_path(&self) -> PathBuf {
        self.temp_dir.path().join(".ticketsync").join("state.json")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
