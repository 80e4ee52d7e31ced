pub struct TestConfig {
    inner: crate::config::Config,
    pub tmpdir: temp_dir::TempDir,
}

impl std::ops::Deref for TestConfig {
    type Target = crate::config::Config;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl TestConfig {
    pub fn new() -> Self {
        let tmpdir = temp_dir::TempDir::with_prefix("aws-session-dev").unwrap();
        let inner = crate::config::Config::new(
            Some(tmpdir.path().join("config")),
            Some(tmpdir.path().join("credentials")),
            crate::config::ConfigData::default(),
        )
        .unwrap();
        Self { inner, tmpdir }
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_file(), content).unwrap();
    }

    pub fn write_credentials(&self, content: &str) {
        std::fs::write(self.credentials_file(), content).unwrap();
    }

    pub fn read_credentials(&self) -> String {
        std::fs::read_to_string(self.credentials_file()).unwrap()
    }
}
