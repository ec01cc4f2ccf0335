//! Minimal reader/writer for the shared AWS `credentials` and `config` files.
//!
//! Both are INI documents made of `[section]` headers followed by
//! `key = value` lines. Reads are best-effort: a missing or unreadable file is
//! an empty store, and lines that do not parse are dropped.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    fn append(&mut self, key: &str, line: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1.push('\n');
            entry.1.push_str(line);
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        before != self.entries.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileStore {
    sections: Vec<Section>,
}

impl ProfileStore {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw),
            Err(err) => {
                tracing::debug!(path = %path.display(), "profile store unreadable: {err}");
                Self::default()
            }
        }
    }

    /// Indented lines continue the previous key's value, as in nested
    /// settings like `s3 =` followed by `  max_concurrent_requests = 20`.
    /// Continuations are kept joined with `\n`.
    pub fn parse(raw: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut last_key: Option<String> = None;
        for raw_line in raw.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                last_key = None;
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if raw_line.starts_with(char::is_whitespace) {
                if let (Some(key), Some(section)) = (&last_key, sections.last_mut()) {
                    section.append(key, line);
                    continue;
                }
            }
            last_key = None;
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                if !sections.iter().any(|s| s.name == name) {
                    sections.push(Section::new(name));
                }
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            // Keys before the first header have no section to attach to.
            let Some(section) = sections.last_mut() else {
                continue;
            };
            let key = key.trim();
            section.set(key, value.trim());
            last_key = Some(key.to_string());
        }
        Self { sections }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Returns the named section, appending an empty one if absent.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in &section.entries {
                let mut lines = value.split('\n');
                match lines.next().unwrap_or_default() {
                    "" => out.push_str(&format!("{key} =\n")),
                    first => out.push_str(&format!("{key} = {first}\n")),
                }
                for nested in lines {
                    out.push_str(&format!("    {nested}\n"));
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.render())
    }
}

/// Name of a profile's section in the config store. The default profile is
/// the one section without the `profile ` prefix.
pub fn config_section_name(profile: &str) -> String {
    if profile == "default" {
        return profile.to_string();
    }
    format!("profile {profile}")
}
