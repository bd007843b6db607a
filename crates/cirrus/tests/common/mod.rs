use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("cirrus.yaml")
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn write_state(&self, state: &serde_json::Value) {
        let dir = self.root.path().join(".cirrus");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("state.json"), state.to_string()).unwrap();
    }

    #[allow(dead_code)]
    pub fn read_state(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.root.path().join(".cirrus/state.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}
