use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Data kept across runs: the session secret per remote project.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LocalState {
    pub sessions: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    pub endpoint: String,
    pub project_id: String,
    pub secret: String,
}

impl LocalState {
    pub fn load(path: &str) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let parent = Path::new(path).parent();
        if let Some(parent) = parent {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn secret_for(&self, endpoint: &str, project_id: &str) -> Option<&str> {
        self.sessions
            .iter()
            .find(|entry| entry.endpoint == endpoint && entry.project_id == project_id)
            .map(|entry| entry.secret.as_str())
    }

    /// Stores `secret`, or forgets the entry when it is `None`.
    pub fn set_secret(&mut self, endpoint: &str, project_id: &str, secret: Option<&str>) {
        self.sessions
            .retain(|entry| !(entry.endpoint == endpoint && entry.project_id == project_id));
        if let Some(secret) = secret {
            self.sessions.push(SessionEntry {
                endpoint: endpoint.to_string(),
                project_id: project_id.to_string(),
                secret: secret.to_string(),
            });
        }
    }
}
