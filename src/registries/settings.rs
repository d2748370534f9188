use std::fmt;
use std::fs;
use std::path::PathBuf;

const SETTINGS_FILE: &str = "mend.yml";
const DEFAULT_DATA_DIR: &str = "Data";
const DEFAULT_CONTEXT_BEFORE: u32 = 2;
const DEFAULT_CONTEXT_AFTER: u32 = 2;

/// Errors from loading the workspace settings file
#[derive(Debug)]
pub enum SettingsError {
    Unreadable(String),
    InvalidYaml(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SettingsError::Unreadable(details) => {
                write!(f, "Failed to read settings: {}", details)
            }
            SettingsError::InvalidYaml(details) => {
                write!(f, "Invalid settings YAML: {}", details)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Workspace settings from `mend.yml`
///
/// Every key is optional; a missing file yields the defaults. CLI flags
/// override whatever was loaded here.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the generated data files.
    pub data_dir: PathBuf,
    /// Patch independent files on separate tasks.
    pub parallel: bool,
    /// Snippet window lines above a diagnostic.
    pub context_before: u32,
    /// Snippet window lines below a diagnostic.
    pub context_after: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            parallel: false,
            context_before: DEFAULT_CONTEXT_BEFORE,
            context_after: DEFAULT_CONTEXT_AFTER,
        }
    }
}

impl Settings {
    /// Loads settings from the given file, or `mend.yml` in the working
    /// directory
    ///
    /// # Arguments
    /// * `settings_path` - Optional path to the settings file (defaults to "mend.yml")
    pub fn load(settings_path: Option<PathBuf>) -> Result<Self, SettingsError> {
        let path = settings_path.unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            SettingsError::Unreadable(format!("{}: {}", path.display(), e))
        })?;

        parse_settings(&content)
    }

    pub fn corrections_path(&self) -> PathBuf {
        self.data_dir.join("corrected_code.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.data_dir.join("error_report.json")
    }

    pub fn descriptions_path(&self) -> PathBuf {
        self.data_dir.join("code_change_descriptions.txt")
    }
}

/// Parses the settings YAML, keeping the default for any key that is
/// missing or has the wrong type
fn parse_settings(yaml_content: &str) -> Result<Settings, SettingsError> {
    use yaml_rust::{Yaml, YamlLoader};

    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| SettingsError::InvalidYaml(e.to_string()))?;

    let mut settings = Settings::default();

    if docs.is_empty() {
        return Ok(settings);
    }

    if let Some(hash) = docs[0].as_hash() {
        if let Some(dir) = hash
            .get(&Yaml::String("data_dir".to_string()))
            .and_then(|v| v.as_str())
        {
            settings.data_dir = PathBuf::from(dir);
        }

        if let Some(parallel) = hash
            .get(&Yaml::String("parallel".to_string()))
            .and_then(|v| v.as_bool())
        {
            settings.parallel = parallel;
        }

        if let Some(n) = hash
            .get(&Yaml::String("context_before".to_string()))
            .and_then(|v| v.as_i64())
        {
            settings.context_before = n.max(0) as u32;
        }

        if let Some(n) = hash
            .get(&Yaml::String("context_after".to_string()))
            .and_then(|v| v.as_i64())
        {
            settings.context_after = n.max(0) as u32;
        }
    }

    Ok(settings)
}
