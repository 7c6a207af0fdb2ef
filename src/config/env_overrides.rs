use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(file_name) = std::env::var("STRATA_DB_FILE")
            && !file_name.is_empty()
        {
            self.database.file_name = file_name;
        }

        if let Ok(level) = std::env::var("STRATA_LOG")
            && !level.trim().is_empty()
        {
            self.log.level = level.trim().to_lowercase();
        }
    }
}
